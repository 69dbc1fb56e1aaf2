//! Resilio - bounded cache and durable operation queue
//!
//! A client-side resilience layer: a byte-budgeted multi-strategy cache
//! with compression, TTL and tagging, and a priority operation queue with
//! retry backoff, dependency gating, batching and crash recovery.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod models;
pub mod network;
pub mod persistence;
pub mod priority;
pub mod queue;
pub mod tasks;

pub use api::AppState;
pub use cache::{BoundedCache, CacheEntry, EvictionStrategy, WriteOptions};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, Config, QueueConfig};
pub use error::{Error, Result};
pub use network::{ManualNetworkMonitor, NetworkMonitor, NetworkStatus};
pub use persistence::{CachePersistence, MemoryPersistence, PersistenceAdapter, SaveOptions};
pub use priority::Priority;
pub use queue::{
    EnqueueOptions, ExecutionError, Executor, OperationKind, OperationQueue, QueuedOperation,
};
pub use tasks::{spawn_cleanup_task, spawn_network_watcher, spawn_queue_ticker};
