//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at configured intervals
//! - Queue Ticker: Runs the operation queue scheduler
//! - Network Watcher: Feeds monitor status changes into the queue

mod cleanup;
mod queue;

pub use cleanup::spawn_cleanup_task;
pub use queue::{spawn_network_watcher, spawn_queue_ticker};
