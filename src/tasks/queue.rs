//! Queue scheduling tasks
//!
//! Drives `OperationQueue::process_tick` on a fixed interval and forwards
//! network monitor changes to the queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::network::NetworkStatus;
use crate::queue::OperationQueue;

/// Spawns the periodic queue scheduler.
///
/// # Returns
/// A JoinHandle to abort during shutdown.
pub fn spawn_queue_ticker(queue: Arc<OperationQueue>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            queue = %queue.config().name,
            interval_ms = interval.as_millis() as u64,
            "Starting queue ticker"
        );

        loop {
            tokio::time::sleep(interval).await;

            let report = queue.process_tick().await;
            if report.dispatched > 0 || report.expired > 0 {
                info!(
                    dispatched = report.dispatched,
                    completed = report.completed,
                    retried = report.retried,
                    failed = report.failed,
                    expired = report.expired,
                    "Queue tick"
                );
            }
        }
    })
}

/// Spawns a task that applies every status published on `status_rx` to the
/// queue. Coming back online triggers an immediate tick.
///
/// Ends when the monitor's sender is dropped.
pub fn spawn_network_watcher(
    queue: Arc<OperationQueue>,
    mut status_rx: watch::Receiver<NetworkStatus>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let initial = status_rx.borrow_and_update().clone();
        queue.set_network_status(initial).await;

        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            if let Some(report) = queue.set_network_status(status).await {
                info!(dispatched = report.dispatched, "Reconnected, queue drained");
            }
        }
        debug!("Network monitor closed, watcher exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::QueueConfig;
    use crate::network::{ManualNetworkMonitor, NetworkMonitor};
    use crate::persistence::MemoryPersistence;
    use crate::queue::{EnqueueOptions, FnExecutor, OperationKind, QueuedOperation};
    use serde_json::{json, Value};

    fn queue() -> Arc<OperationQueue> {
        let executor = FnExecutor::new(|_op: QueuedOperation| async move { Ok(Value::Null) });
        Arc::new(
            OperationQueue::new(
                QueueConfig::default(),
                Arc::new(MemoryPersistence::new()),
                Arc::new(SystemClock),
            )
            .with_executor(OperationKind::Background, Arc::new(executor)),
        )
    }

    #[tokio::test]
    async fn test_ticker_drains_queue() {
        let queue = queue();
        queue
            .enqueue(OperationKind::Background, json!(1), EnqueueOptions::default())
            .await
            .unwrap();

        let handle = spawn_queue_ticker(queue.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.abort();

        assert!(queue.is_empty().await);
        assert_eq!(queue.metrics().await.completed_messages, 1);
    }

    #[tokio::test]
    async fn test_network_watcher_follows_monitor() {
        let queue = queue();
        let monitor = ManualNetworkMonitor::new(NetworkStatus::offline());
        let handle = spawn_network_watcher(queue.clone(), monitor.watch());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!queue.network_status().await.online);

        queue
            .enqueue(OperationKind::Background, json!(1), EnqueueOptions::default())
            .await
            .unwrap();
        monitor.set_online(true);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(queue.network_status().await.online);
        assert!(queue.is_empty().await, "Reconnect should trigger a tick");

        drop(monitor);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle.is_finished());
    }
}
