//! Test fixtures and fake ticket services for integration testing

use async_trait::async_trait;
use matchplay_client::{
    CreateTicketOptions, TicketPlayer, TicketService, TicketServiceError, TicketStatus,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// A call observed by the scripted service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { player_ids: Vec<String>, queue_name: String },
    Get(String),
    Delete(String),
}

/// Ticket service that replays a script and records every call
pub struct ScriptedTicketService {
    create_result: Result<String, TicketServiceError>,
    polls: Mutex<VecDeque<Result<TicketStatus, TicketServiceError>>>,
    delete_result: Result<(), TicketServiceError>,
    calls: Arc<Mutex<Vec<Call>>>,
    /// When set, creation waits until the gate is opened
    create_gate: Option<Arc<Notify>>,
}

impl ScriptedTicketService {
    /// Creation succeeds with `ticket_id`; polls report no assignment
    pub fn with_ticket(ticket_id: &str) -> Self {
        Self {
            create_result: Ok(ticket_id.to_string()),
            polls: Mutex::new(VecDeque::new()),
            delete_result: Ok(()),
            calls: Arc::new(Mutex::new(Vec::new())),
            create_gate: None,
        }
    }

    pub fn failing_creation(error: TicketServiceError) -> Self {
        let mut service = Self::with_ticket("unused");
        service.create_result = Err(error);
        service
    }

    /// Queue the response of the next poll
    pub fn then_poll(self, response: Result<TicketStatus, TicketServiceError>) -> Self {
        if let Ok(mut polls) = self.polls.lock() {
            polls.push_back(response);
        }
        self
    }

    pub fn failing_deletion(mut self, error: TicketServiceError) -> Self {
        self.delete_result = Err(error);
        self
    }

    /// Hold ticket creation until the returned gate is notified
    pub fn gated_creation(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.create_gate = Some(gate.clone());
        (self, gate)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn count_gets(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Get(_)))
            .count()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Delete(ticket_id) => Some(ticket_id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl TicketService for ScriptedTicketService {
    async fn create_ticket(
        &self,
        players: Vec<TicketPlayer>,
        options: CreateTicketOptions,
    ) -> Result<String, TicketServiceError> {
        self.record(Call::Create {
            player_ids: players.into_iter().map(|p| p.id).collect(),
            queue_name: options.queue_name,
        });

        if let Some(gate) = &self.create_gate {
            gate.notified().await;
        }

        self.create_result.clone()
    }

    async fn get_ticket(&self, ticket_id: &str) -> Result<TicketStatus, TicketServiceError> {
        self.record(Call::Get(ticket_id.to_string()));

        self.polls
            .lock()
            .ok()
            .and_then(|mut polls| polls.pop_front())
            .unwrap_or_else(|| Ok(TicketStatus::unassigned()))
    }

    async fn delete_ticket(&self, ticket_id: &str) -> Result<(), TicketServiceError> {
        self.record(Call::Delete(ticket_id.to_string()));
        self.delete_result.clone()
    }
}
