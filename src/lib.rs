//! Matchplay client - client-side matchmaking orchestration
//!
//! This crate requests a matchmaking ticket for a player, polls it until the
//! matchmaker assigns a game server or gives up, and reduces every outcome to a
//! single `MatchResult`.

pub mod config;
pub mod error;
pub mod matchmaker;
pub mod metrics;
pub mod ticket;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result, TicketServiceError};
pub use types::*;

// Re-export key components
pub use matchmaker::{MatchOrchestrator, OrchestratorConfig};
pub use ticket::{SimulatedTicketService, TicketService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
