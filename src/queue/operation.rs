//! Queued operation model

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::priority::Priority;

// == Operation Kind ==
/// Selects which registered executor runs an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Outbound network call; the only kind eligible for batching
    Transport,
    Storage,
    Background,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transport => "transport",
            Self::Storage => "storage",
            Self::Background => "background",
        };
        f.write_str(name)
    }
}

impl FromStr for OperationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "transport" => Ok(Self::Transport),
            "storage" => Ok(Self::Storage),
            "background" => Ok(Self::Background),
            other => Err(Error::Validation(format!(
                "unknown operation kind: {}",
                other
            ))),
        }
    }
}

/// Endpoint a transport operation is sent to. Batching groups by target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub endpoint: String,
    pub method: String,
}

impl Target {
    pub fn new(endpoint: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
        }
    }
}

/// Live states. Completed, failed and expired operations leave the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    #[default]
    Pending,
    Dispatching,
}

// == Queued Operation ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedOperation {
    pub id: String,
    pub kind: OperationKind,
    pub payload: Value,
    #[serde(default)]
    pub target: Option<Target>,
    pub priority: Priority,
    /// Unix ms
    pub enqueued_at: u64,
    pub attempts: u32,
    pub max_attempts: u32,
    /// Unix ms
    #[serde(default)]
    pub expires_at: Option<u64>,
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub status: OperationStatus,
    /// Earliest dispatch time while a retry is pending (Unix ms)
    #[serde(default)]
    pub next_attempt_at: u64,
    #[serde(default)]
    pub last_error: Option<String>,
    /// Set after a failed batch so the operation is dispatched on its own
    #[serde(default)]
    pub batch_exempt: bool,
}

impl QueuedOperation {
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }

    pub fn is_pending(&self) -> bool {
        self.status == OperationStatus::Pending
    }

    /// Whether this operation can join a coalesced transport call.
    pub fn is_batchable(&self) -> bool {
        self.kind == OperationKind::Transport && self.target.is_some() && !self.batch_exempt
    }
}

// == Enqueue Options ==
/// Per-operation settings for `OperationQueue::enqueue`.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    pub priority: Priority,
    /// Overrides the configured default attempt budget
    pub max_attempts: Option<u32>,
    /// Overrides the configured default expiry
    pub expires_in: Option<Duration>,
    /// Ids that must leave the queue before this one may run
    pub depends_on: Vec<String>,
    pub metadata: Option<Value>,
    pub target: Option<Target>,
}

impl EnqueueOptions {
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }
}

// == Message Filter ==
/// Criteria for `OperationQueue::get_messages`. Unset fields match anything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageFilter {
    pub kind: Option<OperationKind>,
    pub priority: Option<Priority>,
    pub status: Option<OperationStatus>,
}

impl MessageFilter {
    pub fn matches(&self, operation: &QueuedOperation) -> bool {
        self.kind.map_or(true, |k| k == operation.kind)
            && self.priority.map_or(true, |p| p == operation.priority)
            && self.status.map_or(true, |s| s == operation.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn operation(kind: OperationKind) -> QueuedOperation {
        QueuedOperation {
            id: "op-1".into(),
            kind,
            payload: json!({"n": 1}),
            target: None,
            priority: Priority::Normal,
            enqueued_at: 0,
            attempts: 0,
            max_attempts: 3,
            expires_at: Some(1_000),
            depends_on: BTreeSet::new(),
            metadata: Value::Null,
            status: OperationStatus::Pending,
            next_attempt_at: 0,
            last_error: None,
            batch_exempt: false,
        }
    }

    #[test]
    fn test_kind_parse_and_display() {
        assert_eq!("Transport".parse::<OperationKind>().unwrap(), OperationKind::Transport);
        assert_eq!(OperationKind::Background.to_string(), "background");
        assert!("email".parse::<OperationKind>().is_err());
    }

    #[test]
    fn test_expiry_is_strict() {
        let op = operation(OperationKind::Storage);
        assert!(!op.is_expired(1_000));
        assert!(op.is_expired(1_001));
    }

    #[test]
    fn test_batchable_requires_transport_target() {
        let mut op = operation(OperationKind::Transport);
        assert!(!op.is_batchable());

        op.target = Some(Target::new("/sync", "POST"));
        assert!(op.is_batchable());

        op.batch_exempt = true;
        assert!(!op.is_batchable());
    }

    #[test]
    fn test_filter_matches() {
        let op = operation(OperationKind::Storage);
        assert!(MessageFilter::default().matches(&op));

        let filter = MessageFilter {
            kind: Some(OperationKind::Transport),
            ..MessageFilter::default()
        };
        assert!(!filter.matches(&op));

        let filter = MessageFilter {
            priority: Some(Priority::Normal),
            status: Some(OperationStatus::Pending),
            ..MessageFilter::default()
        };
        assert!(filter.matches(&op));
    }

    #[test]
    fn test_snapshot_fields_default() {
        let op: QueuedOperation = serde_json::from_value(json!({
            "id": "x",
            "kind": "background",
            "payload": null,
            "priority": "high",
            "enqueuedAt": 5,
            "attempts": 1,
            "maxAttempts": 3
        }))
        .unwrap();

        assert_eq!(op.status, OperationStatus::Pending);
        assert!(op.depends_on.is_empty());
        assert!(!op.batch_exempt);
    }
}
