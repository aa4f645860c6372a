//! Matchmaking orchestrator
//!
//! `MatchOrchestrator` drives one ticket at a time through its lifecycle:
//! creation, polling at a fixed cooldown, and classification of the terminal
//! status into a `MatchResult`. `cancel` may be called from any task while an
//! attempt is polling; the shared state is kept behind a mutex that is never held
//! across an await point.

use crate::matchmaker::adapter::to_ticket_request;
use crate::matchmaker::classify::classify_status;
use crate::metrics::MetricsCollector;
use crate::ticket::TicketService;
use crate::types::{MatchRequest, MatchResult, MatchResultKind, PollOutcome, TicketId};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Delay between two polls of the same ticket
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

const CANCELLED_MESSAGE: &str = "Cancelled Matchmaking";

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub poll_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug)]
struct OrchestratorState {
    is_matchmaking: bool,
    current_ticket: Option<TicketId>,
    cancel_token: CancellationToken,
    /// Bumped for every accepted `matchmake` call
    attempt: u64,
}

/// Client-side driver of a single matchmaking ticket
pub struct MatchOrchestrator {
    ticket_service: Arc<dyn TicketService>,
    config: OrchestratorConfig,
    metrics: Option<Arc<MetricsCollector>>,
    state: Mutex<OrchestratorState>,
}

impl MatchOrchestrator {
    pub fn new(ticket_service: Arc<dyn TicketService>, config: OrchestratorConfig) -> Self {
        Self {
            ticket_service,
            config,
            metrics: None,
            state: Mutex::new(OrchestratorState {
                is_matchmaking: false,
                current_ticket: None,
                cancel_token: CancellationToken::new(),
                attempt: 0,
            }),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Whether an attempt is in flight and has not been cancelled
    pub fn is_active(&self) -> bool {
        self.state().is_matchmaking
    }

    /// Ticket of the attempt in flight, once it has been created
    pub fn current_ticket(&self) -> Option<TicketId> {
        self.state().current_ticket.clone()
    }

    /// Create a ticket for `request` and poll it until it resolves
    ///
    /// Every failure is folded into the returned `MatchResult`. A call made while
    /// another attempt is active returns `AlreadyMatchmaking` and leaves that
    /// attempt alone.
    pub async fn matchmake(&self, request: &MatchRequest) -> MatchResult {
        let started = Instant::now();

        let (attempt, token) = match self.begin_attempt() {
            Some(begun) => begun,
            None => {
                warn!(
                    "Rejected matchmaking request for player '{}': an attempt is already active",
                    request.player_id
                );
                let result = MatchResult::failure(
                    MatchResultKind::AlreadyMatchmaking,
                    "A matchmaking attempt is already in progress",
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_result(result.kind(), started.elapsed());
                }
                return result;
            }
        };

        info!(
            "Starting matchmaking - player: '{}', queue: '{}'",
            request.player_id, request.queue_name
        );

        let mut guard = AttemptGuard {
            orchestrator: self,
            attempt,
            completed: false,
        };
        let result = self.run_attempt(attempt, request, &token).await;
        guard.completed = true;
        drop(guard);

        let elapsed = started.elapsed();
        if let Some(metrics) = &self.metrics {
            metrics.record_result(result.kind(), elapsed);
        }
        info!(
            "Matchmaking finished - player: '{}', result: {}, time: {:.2}s, message: {}",
            request.player_id,
            result.kind(),
            elapsed.as_secs_f64(),
            result.message()
        );

        result
    }

    /// Stop the attempt in flight and withdraw its ticket
    ///
    /// Does nothing when no attempt is active, so repeated calls are harmless. A
    /// failed deletion is logged and counted, never returned.
    pub async fn cancel(&self) {
        let ticket = {
            let mut state = self.state();
            if !state.is_matchmaking {
                return;
            }
            state.is_matchmaking = false;
            state.cancel_token.cancel();
            state.current_ticket.take()
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_attempt_finished();
        }

        match ticket {
            Some(ticket_id) => {
                info!("Cancelling ticket {}", ticket_id);
                delete_ticket_observed(
                    self.ticket_service.as_ref(),
                    self.metrics.as_deref(),
                    &ticket_id,
                )
                .await;
            }
            None => debug!("Cancelled matchmaking before a ticket was created"),
        }
    }

    fn state(&self) -> MutexGuard<'_, OrchestratorState> {
        // Critical sections never panic, so a poisoned lock still holds coherent state
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin_attempt(&self) -> Option<(u64, CancellationToken)> {
        let mut state = self.state();
        if state.is_matchmaking {
            return None;
        }
        state.attempt += 1;
        state.is_matchmaking = true;
        state.current_ticket = None;
        state.cancel_token = CancellationToken::new();

        if let Some(metrics) = &self.metrics {
            metrics.record_attempt_started();
        }
        Some((state.attempt, state.cancel_token.clone()))
    }

    async fn run_attempt(
        &self,
        attempt: u64,
        request: &MatchRequest,
        token: &CancellationToken,
    ) -> MatchResult {
        if let Err(e) = request.validate() {
            return MatchResult::failure(MatchResultKind::TicketCreationError, e.to_string());
        }

        let (players, options) = to_ticket_request(request);
        let ticket_id = match self.ticket_service.create_ticket(players, options).await {
            Ok(ticket_id) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_ticket_created(true);
                }
                ticket_id
            }
            Err(e) => {
                error!(
                    "Ticket creation failed for player '{}': {}",
                    request.player_id, e
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_ticket_created(false);
                }
                return MatchResult::failure(MatchResultKind::TicketCreationError, e.to_string());
            }
        };

        if !self.store_ticket(attempt, token, &ticket_id) {
            // cancel() ran before the ticket existed, so nobody else will delete it
            info!("Matchmaking cancelled during creation of ticket {}", ticket_id);
            delete_ticket_observed(
                self.ticket_service.as_ref(),
                self.metrics.as_deref(),
                &ticket_id,
            )
            .await;
            return cancelled_result();
        }

        debug!("Created ticket {}", ticket_id);
        self.poll_ticket(&ticket_id, token).await
    }

    /// Record the created ticket unless the attempt was cancelled meanwhile
    fn store_ticket(&self, attempt: u64, token: &CancellationToken, ticket_id: &str) -> bool {
        let mut state = self.state();
        if token.is_cancelled() || state.attempt != attempt {
            return false;
        }
        state.current_ticket = Some(ticket_id.to_string());
        true
    }

    async fn poll_ticket(&self, ticket_id: &str, token: &CancellationToken) -> MatchResult {
        while !token.is_cancelled() {
            let outcome = match self.ticket_service.get_ticket(ticket_id).await {
                Ok(status) => classify_status(ticket_id, status),
                Err(e) => {
                    error!("Failed to poll ticket {}: {}", ticket_id, e);
                    PollOutcome::TransportError {
                        cause: format!("Ticket: {} - {}", ticket_id, e),
                    }
                }
            };

            if let Some(metrics) = &self.metrics {
                metrics.record_poll(&outcome);
            }

            // The ticket already belongs to cancel() once the token fired
            if token.is_cancelled() {
                debug!("Discarding poll of ticket {} after cancellation", ticket_id);
                break;
            }

            match outcome.into_result() {
                Some(result) => return result,
                None => debug!("Polled ticket {}, no assignment yet", ticket_id),
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        cancelled_result()
    }

    /// Clear the active flag if `attempt` is still the current one
    fn finish_attempt(&self, attempt: u64) {
        let mut state = self.state();
        if state.attempt != attempt {
            return;
        }
        state.is_matchmaking = false;
        state.current_ticket = None;

        if let Some(metrics) = &self.metrics {
            metrics.record_attempt_finished();
        }
    }

    /// Clean up after a `matchmake` future that never reached a result
    fn abandon_attempt(&self, attempt: u64) {
        let ticket = {
            let mut state = self.state();
            if state.attempt != attempt {
                return;
            }
            state.is_matchmaking = false;
            state.cancel_token.cancel();
            state.current_ticket.take()
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_attempt_finished();
        }
        if let Some(ticket_id) = ticket {
            warn!("Matchmaking attempt abandoned with live ticket {}", ticket_id);
            self.spawn_delete(ticket_id);
        }
    }

    /// Delete a ticket in the background; used where no await is possible
    fn spawn_delete(&self, ticket_id: TicketId) {
        let service = Arc::clone(&self.ticket_service);
        let metrics = self.metrics.clone();

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    delete_ticket_observed(service.as_ref(), metrics.as_deref(), &ticket_id).await;
                });
            }
            Err(_) => warn!(
                "No async runtime to delete ticket {}, leaving it to expire on the matchmaker",
                ticket_id
            ),
        }
    }
}

impl Drop for MatchOrchestrator {
    fn drop(&mut self) {
        // `matchmake` borrows `self` and its `AttemptGuard` clears the ticket on every
        // exit, so no attempt or ticket outlives this point.
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.cancel_token.cancel();
    }
}

/// Resets the orchestrator when a `matchmake` call ends, however it ends
struct AttemptGuard<'a> {
    orchestrator: &'a MatchOrchestrator,
    attempt: u64,
    completed: bool,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.completed {
            self.orchestrator.finish_attempt(self.attempt);
        } else {
            self.orchestrator.abandon_attempt(self.attempt);
        }
    }
}

fn cancelled_result() -> MatchResult {
    MatchResult::failure(MatchResultKind::TicketCancellationError, CANCELLED_MESSAGE)
}

async fn delete_ticket_observed(
    service: &dyn TicketService,
    metrics: Option<&MetricsCollector>,
    ticket_id: &str,
) {
    match service.delete_ticket(ticket_id).await {
        Ok(()) => {
            debug!("Deleted ticket {}", ticket_id);
            if let Some(metrics) = metrics {
                metrics.record_ticket_deleted(true);
            }
        }
        Err(e) => {
            warn!("Failed to delete ticket {}: {}", ticket_id, e);
            if let Some(metrics) = metrics {
                metrics.record_ticket_deleted(false);
            }
        }
    }
}
