//! Ticket service boundary
//!
//! This module defines the contract the orchestrator needs from a remote
//! matchmaker, plus an in-process implementation for running without one.

pub mod service;
pub mod simulated;

// Re-export commonly used types
pub use service::TicketService;
pub use simulated::{SimulatedOutcome, SimulatedTicketService, SimulationConfig};
