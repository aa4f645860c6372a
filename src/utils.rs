//! Utility functions for the matchmaking client

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique ticket ID
pub fn generate_ticket_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a throwaway player ID for anonymous sessions
pub fn generate_player_id() -> String {
    format!("player-{}", Uuid::new_v4().simple())
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Narrow a port reported by the matchmaker to a connectable port
pub fn parse_port(port: Option<i64>) -> Option<u16> {
    port.and_then(|p| u16::try_from(p).ok()).filter(|p| *p != 0)
}
