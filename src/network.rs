//! Network Module
//!
//! Online/offline and link-quality signals consumed by the operation queue.
//! A monitor publishes its status through a `watch` channel; the queue (or
//! `tasks::spawn_network_watcher`) reacts to changes.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

// == Network Status ==
/// Snapshot of the link as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub online: bool,
    /// e.g. "wifi", "cellular", "ethernet"
    #[serde(default)]
    pub connection_type: Option<String>,
    /// e.g. "4g", "3g", "slow-2g"
    #[serde(default)]
    pub effective_type: Option<String>,
}

impl NetworkStatus {
    pub fn online() -> Self {
        Self {
            online: true,
            connection_type: None,
            effective_type: None,
        }
    }

    pub fn offline() -> Self {
        Self {
            online: false,
            connection_type: None,
            effective_type: None,
        }
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::online()
    }
}

/// Supplies network status changes.
pub trait NetworkMonitor: Send + Sync {
    /// Current status.
    fn status(&self) -> NetworkStatus;

    /// Receiver that observes every subsequent status change.
    fn watch(&self) -> watch::Receiver<NetworkStatus>;
}

// == Manual Network Monitor ==
/// Monitor whose status is pushed by the host application (or a test).
#[derive(Debug)]
pub struct ManualNetworkMonitor {
    tx: watch::Sender<NetworkStatus>,
}

impl ManualNetworkMonitor {
    pub fn new(initial: NetworkStatus) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Publishes a new status. Unchanged statuses are not re-broadcast.
    pub fn set_status(&self, status: NetworkStatus) {
        self.tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    pub fn set_online(&self, online: bool) {
        let mut status = self.status();
        status.online = online;
        self.set_status(status);
    }
}

impl Default for ManualNetworkMonitor {
    fn default() -> Self {
        Self::new(NetworkStatus::online())
    }
}

impl NetworkMonitor for ManualNetworkMonitor {
    fn status(&self) -> NetworkStatus {
        self.tx.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<NetworkStatus> {
        self.tx.subscribe()
    }
}
