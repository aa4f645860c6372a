//! Common types used throughout the matchmaking client

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::MatchmakingError;

/// Identifier issued by the matchmaker for a created ticket
pub type TicketId = String;

/// Attribute payload attached to players and tickets
pub type Attributes = BTreeMap<String, Value>;

/// A single player's request to be matched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub player_id: String,
    /// Opaque queue name the matchmaker routes on
    pub queue_name: String,
    /// Attributes evaluated by the queue's rules
    #[serde(default)]
    pub ticket_attributes: Attributes,
    /// Custom data carried on the player entry of the ticket
    #[serde(default)]
    pub player_attributes: Attributes,
}

impl MatchRequest {
    pub fn new(player_id: impl Into<String>, queue_name: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            queue_name: queue_name.into(),
            ticket_attributes: Attributes::new(),
            player_attributes: Attributes::new(),
        }
    }

    pub fn with_ticket_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ticket_attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_player_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.player_attributes.insert(key.into(), value.into());
        self
    }

    /// Reject requests the matchmaker could never accept
    pub fn validate(&self) -> Result<(), MatchmakingError> {
        if self.player_id.trim().is_empty() {
            return Err(MatchmakingError::InvalidRequest {
                reason: "player id cannot be empty".to_string(),
            });
        }
        if self.queue_name.trim().is_empty() {
            return Err(MatchmakingError::InvalidRequest {
                reason: "queue name cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Player entry sent with a ticket creation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketPlayer {
    pub id: String,
    #[serde(default)]
    pub attributes: Attributes,
}

/// Queue routing and ticket attributes for a creation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTicketOptions {
    pub queue_name: String,
    #[serde(default)]
    pub attributes: Attributes,
}

/// Assignment state reported by the matchmaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentStatus {
    #[serde(alias = "InProgress")]
    Pending,
    Found,
    Timeout,
    Failed,
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentStatus::Pending => write!(f, "Pending"),
            AssignmentStatus::Found => write!(f, "Found"),
            AssignmentStatus::Timeout => write!(f, "Timeout"),
            AssignmentStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Server assignment payload of a ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub status: AssignmentStatus,
    pub ip: Option<String>,
    pub port: Option<i64>,
    pub message: Option<String>,
}

impl Assignment {
    pub fn pending() -> Self {
        Self {
            status: AssignmentStatus::Pending,
            ip: None,
            port: None,
            message: None,
        }
    }

    pub fn found(ip: impl Into<String>, port: i64) -> Self {
        Self {
            status: AssignmentStatus::Found,
            ip: Some(ip.into()),
            port: Some(port),
            message: None,
        }
    }

    pub fn terminal(status: AssignmentStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            ip: None,
            port: None,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Response of a ticket status call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStatus {
    /// `None` until the matchmaker has started assigning the ticket
    pub assignment: Option<Assignment>,
}

impl TicketStatus {
    pub fn unassigned() -> Self {
        Self { assignment: None }
    }

    pub fn with_assignment(assignment: Assignment) -> Self {
        Self {
            assignment: Some(assignment),
        }
    }
}

/// Classification of one poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Pending,
    Assigned {
        ip: String,
        port: u16,
        message: String,
    },
    AssignmentFailed {
        reason: String,
    },
    TransportError {
        cause: String,
    },
}

/// Kind of result a matchmaking attempt resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchResultKind {
    Success,
    TicketCreationError,
    TicketCancellationError,
    TicketRetrievalError,
    MatchAssignmentError,
    /// `matchmake` was called while another attempt was still active
    AlreadyMatchmaking,
}

impl MatchResultKind {
    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchResultKind::Success => "success",
            MatchResultKind::TicketCreationError => "ticket_creation_error",
            MatchResultKind::TicketCancellationError => "ticket_cancellation_error",
            MatchResultKind::TicketRetrievalError => "ticket_retrieval_error",
            MatchResultKind::MatchAssignmentError => "match_assignment_error",
            MatchResultKind::AlreadyMatchmaking => "already_matchmaking",
        }
    }
}

impl std::fmt::Display for MatchResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a matchmaking attempt
///
/// `ip` and `port` are set on `Success` and on nothing else. Deserialization goes
/// through the same constructors and rejects records that break the pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MatchResultRecord")]
pub struct MatchResult {
    kind: MatchResultKind,
    ip: Option<String>,
    port: Option<u16>,
    message: String,
}

impl MatchResult {
    pub fn success(ip: impl Into<String>, port: u16, message: impl Into<String>) -> Self {
        Self {
            kind: MatchResultKind::Success,
            ip: Some(ip.into()),
            port: Some(port),
            message: message.into(),
        }
    }

    /// Build a non-success result. An empty message is replaced by the kind label
    /// so callers always have something to display.
    ///
    /// A success carries an endpoint, so `Success` passed here is reported as a
    /// `MatchAssignmentError` instead.
    pub fn failure(kind: MatchResultKind, message: impl Into<String>) -> Self {
        let kind = match kind {
            MatchResultKind::Success => MatchResultKind::MatchAssignmentError,
            other => other,
        };
        let message = message.into();
        let message = if message.trim().is_empty() {
            format!("Matchmaking failed: {}", kind)
        } else {
            message
        };
        Self {
            kind,
            ip: None,
            port: None,
            message,
        }
    }

    pub fn kind(&self) -> MatchResultKind {
        self.kind
    }

    pub fn is_success(&self) -> bool {
        self.kind == MatchResultKind::Success
    }

    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// `ip:port` of the assigned server
    pub fn endpoint(&self) -> Option<String> {
        match (&self.ip, self.port) {
            (Some(ip), Some(port)) => Some(format!("{}:{}", ip, port)),
            _ => None,
        }
    }
}

/// Wire shape of `MatchResult`, checked before it becomes one
#[derive(Deserialize)]
struct MatchResultRecord {
    kind: MatchResultKind,
    ip: Option<String>,
    port: Option<u16>,
    #[serde(default)]
    message: String,
}

impl TryFrom<MatchResultRecord> for MatchResult {
    type Error = String;

    fn try_from(record: MatchResultRecord) -> Result<Self, Self::Error> {
        match (record.kind, record.ip, record.port) {
            (MatchResultKind::Success, Some(ip), Some(port)) if !ip.is_empty() && port != 0 => {
                Ok(Self::success(ip, port, record.message))
            }
            (MatchResultKind::Success, ip, port) => Err(format!(
                "Success result without a valid endpoint (ip: {:?}, port: {:?})",
                ip, port
            )),
            (kind, None, None) => Ok(Self::failure(kind, record.message)),
            (kind, _, _) => Err(format!("{} result must not carry an endpoint", kind)),
        }
    }
}
