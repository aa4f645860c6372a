//! Matchmaking ticket lifecycle
//!
//! This module turns a player's request into a ticket, polls it and classifies
//! whatever the matchmaker reports into a single `MatchResult`.

pub mod adapter;
pub mod classify;
pub mod orchestrator;

// Re-export commonly used types
pub use adapter::to_ticket_request;
pub use classify::classify_status;
pub use orchestrator::{MatchOrchestrator, OrchestratorConfig, DEFAULT_POLL_INTERVAL};
