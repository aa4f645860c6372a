//! Ticket service interface
//!
//! The remote matchmaker is reached only through this trait. Implementations own
//! the wire protocol, authentication and per-call timeouts; the orchestrator only
//! sees ticket ids, status payloads and `TicketServiceError`s.

use crate::error::TicketServiceError;
use crate::types::{CreateTicketOptions, TicketId, TicketPlayer, TicketStatus};
use async_trait::async_trait;

/// Create/get/delete operations of a remote matchmaker
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketService: Send + Sync {
    /// Submit a ticket for the given players and return its id
    async fn create_ticket(
        &self,
        players: Vec<TicketPlayer>,
        options: CreateTicketOptions,
    ) -> Result<TicketId, TicketServiceError>;

    /// Fetch the current status of a ticket
    async fn get_ticket(&self, ticket_id: &str) -> Result<TicketStatus, TicketServiceError>;

    /// Withdraw a ticket from matchmaking
    async fn delete_ticket(&self, ticket_id: &str) -> Result<(), TicketServiceError>;
}
