//! Metrics for the matchmaking client
//!
//! Prometheus counters describing ticket creation, polling, results and deletions.

pub mod collector;

pub use collector::MetricsCollector;
