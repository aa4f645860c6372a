//! Error types for the matchmaking client
//!
//! Failures of the remote ticket service are kept separate from the crate's own
//! errors: the orchestrator folds the former into a `MatchResult`, the latter
//! surface from configuration loading and request validation.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Failures reported by a `TicketService` call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TicketServiceError {
    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("Matchmaker service error ({code}): {message}")]
    Service { code: u16, message: String },

    #[error("Ticket not found: {ticket_id}")]
    NotFound { ticket_id: String },
}

impl TicketServiceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// Custom error types for the matchmaking client
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Invalid match request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}
