//! Metrics collection using Prometheus
//!
//! Counters and gauges describing the ticket lifecycle of the matchmaking client.
//! Deletion failures on the cancellation path are recorded here since they have
//! no `MatchResult` to travel in.

use crate::types::{MatchResultKind, PollOutcome};
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the matchmaking client
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,

    /// Ticket creation calls by status
    pub tickets_created_total: IntCounterVec,

    /// Poll cycles by outcome
    pub ticket_polls_total: IntCounterVec,

    /// Finished attempts by result kind
    pub match_results_total: IntCounterVec,

    /// Ticket deletions by status
    pub ticket_deletions_total: IntCounterVec,

    /// 1 while an attempt is in flight
    pub matchmaking_active: IntGauge,

    /// Wall time of finished attempts
    pub attempt_duration_seconds: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        Self::with_registry(Arc::new(Registry::new()))
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let tickets_created_total = IntCounterVec::new(
            Opts::new(
                "matchplay_tickets_created_total",
                "Ticket creation calls by status",
            ),
            &["status"],
        )?;
        registry.register(Box::new(tickets_created_total.clone()))?;

        let ticket_polls_total = IntCounterVec::new(
            Opts::new("matchplay_ticket_polls_total", "Ticket polls by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(ticket_polls_total.clone()))?;

        let match_results_total = IntCounterVec::new(
            Opts::new(
                "matchplay_match_results_total",
                "Finished matchmaking attempts by result",
            ),
            &["result"],
        )?;
        registry.register(Box::new(match_results_total.clone()))?;

        let ticket_deletions_total = IntCounterVec::new(
            Opts::new(
                "matchplay_ticket_deletions_total",
                "Ticket deletions by status",
            ),
            &["status"],
        )?;
        registry.register(Box::new(ticket_deletions_total.clone()))?;

        let matchmaking_active = IntGauge::new(
            "matchplay_matchmaking_active",
            "Whether a matchmaking attempt is in flight",
        )?;
        registry.register(Box::new(matchmaking_active.clone()))?;

        let attempt_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "matchplay_attempt_duration_seconds",
                "Duration of matchmaking attempts",
            )
            .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
        )?;
        registry.register(Box::new(attempt_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            tickets_created_total,
            ticket_polls_total,
            match_results_total,
            ticket_deletions_total,
            matchmaking_active,
            attempt_duration_seconds,
        })
    }

    pub fn record_attempt_started(&self) {
        self.matchmaking_active.set(1);
    }

    pub fn record_ticket_created(&self, success: bool) {
        let status = if success { "success" } else { "error" };
        self.tickets_created_total
            .with_label_values(&[status])
            .inc();
    }

    pub fn record_poll(&self, outcome: &PollOutcome) {
        self.ticket_polls_total
            .with_label_values(&[outcome.label()])
            .inc();
    }

    pub fn record_result(&self, kind: MatchResultKind, duration: Duration) {
        self.match_results_total
            .with_label_values(&[kind.as_str()])
            .inc();
        if kind != MatchResultKind::AlreadyMatchmaking {
            self.attempt_duration_seconds.observe(duration.as_secs_f64());
        }
    }

    pub fn record_attempt_finished(&self) {
        self.matchmaking_active.set(0);
    }

    pub fn record_ticket_deleted(&self, success: bool) {
        let status = if success { "success" } else { "error" };
        self.ticket_deletions_total
            .with_label_values(&[status])
            .inc();
    }

    /// Count of results of one kind recorded so far
    pub fn result_count(&self, kind: MatchResultKind) -> u64 {
        self.match_results_total
            .with_label_values(&[kind.as_str()])
            .get()
    }

    /// Count of deletions with the given outcome recorded so far
    pub fn deletion_count(&self, success: bool) -> u64 {
        let status = if success { "success" } else { "error" };
        self.ticket_deletions_total.with_label_values(&[status]).get()
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        Ok(encoder.encode_to_string(&self.registry.gather())?)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}
