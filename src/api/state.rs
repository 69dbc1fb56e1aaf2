//! Shared application state for the inspection API

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::cache::{BoundedCache, WriteOptions};
use crate::clock::{Clock, SystemClock};
use crate::config::{CacheConfig, Config};
use crate::network::ManualNetworkMonitor;
use crate::persistence::CachePersistence;
use crate::queue::{
    ExecutionError, Executor, FnExecutor, OperationKind, OperationQueue, QueuedOperation,
};

/// Application state shared across all handlers.
///
/// Holds the data cache, a separate cache that stores queue snapshots,
/// the operation queue and the network monitor the host pushes status to.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<RwLock<BoundedCache>>,
    pub snapshots: Arc<RwLock<BoundedCache>>,
    pub queue: Arc<OperationQueue>,
    pub network: Arc<ManualNetworkMonitor>,
}

impl AppState {
    /// Creates the state on the system clock.
    pub fn from_config(config: &Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates the state with an injected clock.
    ///
    /// Registers a `storage` executor that writes `{"key", "value"}`
    /// payloads into the data cache.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let cache = Arc::new(RwLock::new(BoundedCache::with_clock(
            config.cache.clone(),
            clock.clone(),
        )));
        let snapshots = Arc::new(RwLock::new(BoundedCache::with_clock(
            snapshot_cache_config(&config.cache),
            clock.clone(),
        )));

        let queue = OperationQueue::new(
            config.queue.clone(),
            Arc::new(CachePersistence::new(snapshots.clone())),
            clock,
        )
        .with_executor(OperationKind::Storage, storage_executor(cache.clone()));

        Self {
            cache,
            snapshots,
            queue: Arc::new(queue),
            network: Arc::new(ManualNetworkMonitor::default()),
        }
    }
}

/// Snapshot storage gets its own instance so data traffic never evicts it.
/// A queue snapshot is one entry that grows with the queue, so it may take
/// the whole budget.
fn snapshot_cache_config(data: &CacheConfig) -> CacheConfig {
    CacheConfig {
        name: "snapshots".to_string(),
        max_size: data.max_size,
        max_entries: 16,
        max_entry_size: Some(data.max_size),
        default_ttl: None,
        enable_compression: true,
        ..CacheConfig::default()
    }
}

fn storage_executor(cache: Arc<RwLock<BoundedCache>>) -> Arc<dyn Executor> {
    Arc::new(FnExecutor::new(move |op: QueuedOperation| {
        let cache = cache.clone();
        async move {
            let Some(key) = op.payload.get("key").and_then(Value::as_str) else {
                return Err(ExecutionError::permanent("storage payload needs a string 'key'"));
            };
            let value = op.payload.get("value").cloned().unwrap_or(Value::Null);

            let stored = cache.write().await.set(key, &value, WriteOptions::default());
            if stored {
                Ok(json!({ "stored": key }))
            } else {
                Err(ExecutionError::permanent(format!(
                    "cache rejected value for '{}'",
                    key
                )))
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::EnqueueOptions;

    #[tokio::test]
    async fn test_queue_snapshot_may_exceed_data_entry_limit() {
        let config = Config {
            cache: CacheConfig {
                max_size: 40_000,
                ..CacheConfig::default()
            },
            ..Config::default()
        };
        let state = AppState::from_config(&config);

        let mut ids = Vec::new();
        for i in 0..150 {
            let id = state
                .queue
                .enqueue(
                    OperationKind::Storage,
                    json!({"key": format!("k{}", i), "value": i}),
                    EnqueueOptions::default(),
                )
                .await
                .unwrap();
            ids.push(id);
        }
        let report = state.queue.process_tick().await;
        assert_eq!(report.completed, 10);

        let snapshot_size = state
            .snapshots
            .read()
            .await
            .peek("snapshot:operation-queue")
            .unwrap()
            .size_bytes;
        assert!(snapshot_size * 10 > config.cache.max_size);

        let restarted = OperationQueue::new(
            config.queue.clone(),
            Arc::new(CachePersistence::new(state.snapshots.clone())),
            Arc::new(SystemClock),
        );
        assert_eq!(restarted.restore().await, 140);
        for done in &ids[..10] {
            assert!(restarted.get_message(done).await.is_none());
        }
        for live in &ids[10..] {
            assert!(restarted.get_message(live).await.is_some());
        }
    }

    #[tokio::test]
    async fn test_storage_executor_writes_into_cache() {
        let state = AppState::from_config(&Config::default());
        state
            .queue
            .enqueue(
                OperationKind::Storage,
                json!({"key": "greeting", "value": "hello"}),
                EnqueueOptions::default(),
            )
            .await
            .unwrap();

        let report = state.queue.process_tick().await;
        assert_eq!(report.completed, 1);
        assert_eq!(
            state.cache.write().await.get::<String>("greeting").unwrap(),
            "hello"
        );
        assert!(state.snapshots.read().await.has("snapshot:operation-queue"));
    }

    #[tokio::test]
    async fn test_storage_executor_rejects_payload_without_key() {
        let state = AppState::from_config(&Config::default());
        state
            .queue
            .enqueue(OperationKind::Storage, json!({"value": 1}), EnqueueOptions::default())
            .await
            .unwrap();

        let report = state.queue.process_tick().await;
        assert_eq!(report.failed, 1);
    }
}
