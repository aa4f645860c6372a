//! Classification of ticket status payloads
//!
//! Each poll produces a `PollOutcome`; terminal outcomes then map onto the
//! `MatchResult` the attempt resolves to.

use crate::types::{AssignmentStatus, MatchResult, MatchResultKind, PollOutcome, TicketStatus};
use crate::utils::parse_port;

/// Classify the status returned by a poll of `ticket_id`
pub fn classify_status(ticket_id: &str, status: TicketStatus) -> PollOutcome {
    let assignment = match status.assignment {
        Some(assignment) => assignment,
        None => return PollOutcome::Pending,
    };
    let message = assignment.message.unwrap_or_default();

    match assignment.status {
        AssignmentStatus::Pending => PollOutcome::Pending,
        AssignmentStatus::Found => {
            let ip = assignment.ip.filter(|ip| !ip.trim().is_empty());
            match (ip, parse_port(assignment.port)) {
                (Some(ip), Some(port)) => PollOutcome::Assigned { ip, port, message },
                (None, _) => PollOutcome::AssignmentFailed {
                    reason: format!("Ticket: {} - Ip missing? - {}", ticket_id, message),
                },
                (Some(_), None) => PollOutcome::AssignmentFailed {
                    reason: format!(
                        "Ticket: {} - Port missing? - {:?} - {}",
                        ticket_id, assignment.port, message
                    ),
                },
            }
        }
        AssignmentStatus::Timeout | AssignmentStatus::Failed => PollOutcome::AssignmentFailed {
            reason: format!("Ticket: {} - {} - {}", ticket_id, assignment.status, message),
        },
    }
}

impl PollOutcome {
    /// Result of a terminal outcome; `None` while the ticket is still pending
    pub fn into_result(self) -> Option<MatchResult> {
        match self {
            PollOutcome::Pending => None,
            PollOutcome::Assigned { ip, port, message } => {
                Some(MatchResult::success(ip, port, message))
            }
            PollOutcome::AssignmentFailed { reason } => Some(MatchResult::failure(
                MatchResultKind::MatchAssignmentError,
                reason,
            )),
            PollOutcome::TransportError { cause } => Some(MatchResult::failure(
                MatchResultKind::TicketRetrievalError,
                cause,
            )),
        }
    }

    /// Metric label for this outcome
    pub fn label(&self) -> &'static str {
        match self {
            PollOutcome::Pending => "pending",
            PollOutcome::Assigned { .. } => "assigned",
            PollOutcome::AssignmentFailed { .. } => "assignment_failed",
            PollOutcome::TransportError { .. } => "transport_error",
        }
    }
}
