//! In-process matchmaker
//!
//! `SimulatedTicketService` stands in for a remote matchmaker when running the
//! client without one: every ticket stays pending for a configured number of polls
//! and then resolves into the configured outcome. Resolved tickets are dropped the
//! same way a real matchmaker removes tickets once they reach a terminal state.

use crate::error::TicketServiceError;
use crate::ticket::service::TicketService;
use crate::types::{
    Assignment, AssignmentStatus, CreateTicketOptions, TicketId, TicketPlayer, TicketStatus,
};
use crate::utils::generate_ticket_id;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

/// How simulated tickets resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedOutcome {
    Found { ip: String, port: u16 },
    Timeout,
    Failed,
}

/// Behaviour of the simulated matchmaker
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Polls a ticket stays pending before it resolves
    pub polls_until_resolved: u32,
    pub outcome: SimulatedOutcome,
    /// Artificial delay added to every call
    pub latency: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            polls_until_resolved: 3,
            outcome: SimulatedOutcome::Found {
                ip: "127.0.0.1".to_string(),
                port: 7777,
            },
            latency: Duration::from_millis(50),
        }
    }
}

#[derive(Debug)]
struct SimulatedTicket {
    queue_name: String,
    polls: u32,
}

/// Ticket service backed by an in-memory ticket table
#[derive(Debug)]
pub struct SimulatedTicketService {
    config: SimulationConfig,
    tickets: RwLock<HashMap<TicketId, SimulatedTicket>>,
}

impl SimulatedTicketService {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            tickets: RwLock::new(HashMap::new()),
        }
    }

    /// Number of tickets that are neither resolved nor deleted
    pub fn active_ticket_count(&self) -> usize {
        self.tickets.read().map(|t| t.len()).unwrap_or_default()
    }

    pub fn contains_ticket(&self, ticket_id: &str) -> bool {
        self.tickets
            .read()
            .map(|t| t.contains_key(ticket_id))
            .unwrap_or_default()
    }

    async fn simulate_latency(&self) {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
    }

    fn lock_error() -> TicketServiceError {
        TicketServiceError::Service {
            code: 500,
            message: "Failed to acquire ticket table lock".to_string(),
        }
    }

    fn resolve(&self, ticket: &SimulatedTicket) -> Assignment {
        match &self.config.outcome {
            SimulatedOutcome::Found { ip, port } => Assignment::found(ip.clone(), i64::from(*port))
                .with_message(format!("Assigned to simulated server for {}", ticket.queue_name)),
            SimulatedOutcome::Timeout => Assignment::terminal(
                AssignmentStatus::Timeout,
                format!("No match found in queue {}", ticket.queue_name),
            ),
            SimulatedOutcome::Failed => {
                Assignment::terminal(AssignmentStatus::Failed, "Server allocation failed")
            }
        }
    }
}

impl Default for SimulatedTicketService {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

#[async_trait]
impl TicketService for SimulatedTicketService {
    async fn create_ticket(
        &self,
        players: Vec<TicketPlayer>,
        options: CreateTicketOptions,
    ) -> Result<TicketId, TicketServiceError> {
        self.simulate_latency().await;

        if players.is_empty() {
            return Err(TicketServiceError::Service {
                code: 400,
                message: "A ticket requires at least one player".to_string(),
            });
        }

        let ticket_id = generate_ticket_id();
        let mut tickets = self.tickets.write().map_err(|_| Self::lock_error())?;
        tickets.insert(
            ticket_id.clone(),
            SimulatedTicket {
                queue_name: options.queue_name,
                polls: 0,
            },
        );

        debug!("Simulated matchmaker created ticket {}", ticket_id);
        Ok(ticket_id)
    }

    async fn get_ticket(&self, ticket_id: &str) -> Result<TicketStatus, TicketServiceError> {
        self.simulate_latency().await;

        let mut tickets = self.tickets.write().map_err(|_| Self::lock_error())?;
        let ticket = tickets
            .get_mut(ticket_id)
            .ok_or_else(|| TicketServiceError::NotFound {
                ticket_id: ticket_id.to_string(),
            })?;
        ticket.polls += 1;

        if ticket.polls <= self.config.polls_until_resolved {
            // The first poll sees a ticket nobody has picked up yet
            return Ok(if ticket.polls == 1 {
                TicketStatus::unassigned()
            } else {
                TicketStatus::with_assignment(Assignment::pending())
            });
        }

        let assignment = self.resolve(ticket);
        tickets.remove(ticket_id);
        Ok(TicketStatus::with_assignment(assignment))
    }

    async fn delete_ticket(&self, ticket_id: &str) -> Result<(), TicketServiceError> {
        self.simulate_latency().await;

        let mut tickets = self.tickets.write().map_err(|_| Self::lock_error())?;
        match tickets.remove(ticket_id) {
            Some(_) => {
                debug!("Simulated matchmaker deleted ticket {}", ticket_id);
                Ok(())
            }
            None => Err(TicketServiceError::NotFound {
                ticket_id: ticket_id.to_string(),
            }),
        }
    }
}
