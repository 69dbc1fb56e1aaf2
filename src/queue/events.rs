//! Queue lifecycle events

use serde::Serialize;

use super::operation::OperationKind;
use crate::network::NetworkStatus;
use crate::priority::Priority;

/// Why an operation left the queue without running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DequeueReason {
    /// Removed by `dequeue`
    Cancelled,
    /// Displaced to make room at capacity
    Evicted,
}

/// Emitted by `OperationQueue`. Routine outcomes are reported here rather
/// than returned to the enqueuing caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QueueEvent {
    Enqueued {
        id: String,
        kind: OperationKind,
        priority: Priority,
    },
    Dequeued {
        id: String,
        reason: DequeueReason,
    },
    Processed {
        id: String,
        result: serde_json::Value,
        duration_ms: u64,
    },
    Failed {
        id: String,
        attempts: u32,
        error: String,
    },
    Expired {
        id: String,
    },
    Retry {
        id: String,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    NetworkStatusChanged {
        status: NetworkStatus,
    },
    Cleared {
        count: usize,
    },
}
