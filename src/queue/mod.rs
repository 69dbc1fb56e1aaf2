//! Queue Module
//!
//! Durable, network-aware operation queue with priority dispatch,
//! dependency gating, retry backoff and optional batching.

mod backoff;
mod events;
mod executor;
mod operation;
mod snapshot;
mod stats;
mod store;


pub use backoff::Backoff;
pub use events::{DequeueReason, QueueEvent};
pub use executor::{ExecutionError, Executor, FnExecutor};
pub use operation::{
    EnqueueOptions, MessageFilter, OperationKind, OperationStatus, QueuedOperation, Target,
};
pub use snapshot::{QueueSnapshot, QUEUE_SNAPSHOT_VERSION};
pub use stats::{QueueMetrics, QueueStats};
pub use store::{OperationQueue, TickReport};
