//! Persisted queue state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::operation::{OperationStatus, QueuedOperation};
use crate::error::{Error, Result};

pub const QUEUE_SNAPSHOT_VERSION: u32 = 1;

/// What the queue writes through its persistence adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// Live operations in dispatch order
    pub operations: Vec<QueuedOperation>,
}

impl QueueSnapshot {
    pub fn new(operations: Vec<QueuedOperation>, now_ms: u64) -> Self {
        Self {
            version: QUEUE_SNAPSHOT_VERSION,
            saved_at: DateTime::from_timestamp_millis(now_ms as i64).unwrap_or_default(),
            operations,
        }
    }

    /// Parses a stored snapshot and keeps the operations still worth running.
    ///
    /// Expired operations are dropped. Operations caught mid-dispatch go
    /// back to pending since their outcome was never recorded.
    pub fn recover(value: serde_json::Value, now_ms: u64) -> Result<Vec<QueuedOperation>> {
        let snapshot: QueueSnapshot = serde_json::from_value(value)?;
        if snapshot.version != QUEUE_SNAPSHOT_VERSION {
            return Err(Error::Persistence(format!(
                "unsupported queue snapshot version: {}",
                snapshot.version
            )));
        }

        Ok(snapshot
            .operations
            .into_iter()
            .filter(|op| !op.is_expired(now_ms))
            .map(|mut op| {
                op.status = OperationStatus::Pending;
                op
            })
            .collect())
    }
}
