//! Operation Queue Module
//!
//! Priority-ordered queue of deferred operations. Each `process_tick`
//! dispatches admissible operations to the executor registered for their
//! kind, retries transient failures with backoff and snapshots the live
//! set through a `PersistenceAdapter` after every mutation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::backoff::Backoff;
use super::events::{DequeueReason, QueueEvent};
use super::executor::{ExecutionError, Executor};
use super::operation::{
    EnqueueOptions, MessageFilter, OperationKind, OperationStatus, QueuedOperation, Target,
};
use super::snapshot::QueueSnapshot;
use super::stats::{QueueMetrics, QueueStats};
use crate::clock::Clock;
use crate::config::QueueConfig;
use crate::error::{Error, Result};
use crate::events::EventBus;
use crate::network::NetworkStatus;
use crate::persistence::{PersistenceAdapter, SaveOptions};
use crate::priority::Priority;

/// Summary of one `process_tick` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    /// Operations handed to executors (batched ones counted individually)
    pub dispatched: usize,
    /// Coalesced transport calls made
    pub batches: usize,
    pub completed: usize,
    pub retried: usize,
    pub failed: usize,
    pub expired: usize,
    /// Batch members returned to pending after a batch-level failure
    pub deferred: usize,
}

#[derive(Debug)]
struct QueueState {
    /// Live operations, highest priority first, FIFO within a priority
    operations: Vec<QueuedOperation>,
    network: NetworkStatus,
    stats: QueueStats,
}

enum Dispatch {
    Single(QueuedOperation),
    Batch(Vec<QueuedOperation>),
}

enum Outcome {
    Single {
        id: String,
        result: std::result::Result<Value, ExecutionError>,
        elapsed_ms: u64,
    },
    Batch {
        ids: Vec<String>,
        result: std::result::Result<Value, ExecutionError>,
        elapsed_ms: u64,
    },
}

// == Operation Queue ==
pub struct OperationQueue {
    config: QueueConfig,
    state: Mutex<QueueState>,
    executors: HashMap<OperationKind, Arc<dyn Executor>>,
    persistence: Arc<dyn PersistenceAdapter>,
    clock: Arc<dyn Clock>,
    backoff: Backoff,
    events: EventBus<QueueEvent>,
}

impl OperationQueue {
    // == Constructor ==
    /// Creates an empty, online queue. Register executors with
    /// `with_executor` and call `restore` before first use.
    pub fn new(
        config: QueueConfig,
        persistence: Arc<dyn PersistenceAdapter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backoff: Backoff::from_config(&config),
            state: Mutex::new(QueueState {
                operations: Vec::new(),
                network: NetworkStatus::online(),
                stats: QueueStats::new(config.metrics_window),
            }),
            config,
            executors: HashMap::new(),
            persistence,
            clock,
            events: EventBus::new(),
        }
    }

    pub fn with_executor(mut self, kind: OperationKind, executor: Arc<dyn Executor>) -> Self {
        self.executors.insert(kind, executor);
        self
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    // == Restore ==
    /// Replaces the live set with the last persisted snapshot.
    ///
    /// Expired operations are discarded. A missing, unreadable or corrupt
    /// snapshot leaves the queue empty and is only logged. Returns the
    /// number of operations recovered.
    pub async fn restore(&self) -> usize {
        if !self.config.enable_persistence {
            return 0;
        }

        let value = match self.persistence.load(&self.config.name).await {
            Ok(Some(value)) => value,
            Ok(None) => return 0,
            Err(e) => {
                warn!(queue = %self.config.name, error = %e, "Queue snapshot load failed, starting empty");
                return 0;
            }
        };

        let mut operations = match QueueSnapshot::recover(value, self.clock.now_ms()) {
            Ok(operations) => operations,
            Err(e) => {
                warn!(queue = %self.config.name, error = %e, "Discarding unreadable queue snapshot");
                return 0;
            }
        };
        operations.sort_by(|a, b| b.priority.cmp(&a.priority));
        operations.truncate(self.config.max_size);

        let count = operations.len();
        let mut state = self.state.lock().await;
        state.stats.total += count as u64;
        state.operations = operations;
        info!(queue = %self.config.name, count, "Queue restored from snapshot");
        count
    }

    // == Enqueue ==
    /// Adds an operation and returns its id.
    ///
    /// At capacity, expired operations are purged first, then the oldest
    /// pending Low-priority operation is displaced. Fails with
    /// `Error::ResourceExhausted` if neither frees a slot.
    pub async fn enqueue(
        &self,
        kind: OperationKind,
        payload: Value,
        options: EnqueueOptions,
    ) -> Result<String> {
        let max_attempts = options.max_attempts.unwrap_or(self.config.max_attempts);
        if max_attempts == 0 {
            return Err(Error::Validation("max_attempts must be > 0".into()));
        }

        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;
        if state.operations.len() >= self.config.max_size {
            self.make_room(&mut state, now)?;
        }

        let expires_at = options
            .expires_in
            .or(self.config.default_expires_in)
            .map(|ttl| now.saturating_add(duration_ms(ttl)));
        let operation = QueuedOperation {
            id: Uuid::new_v4().to_string(),
            kind,
            payload,
            target: options.target,
            priority: options.priority,
            enqueued_at: now,
            attempts: 0,
            max_attempts,
            expires_at,
            depends_on: options.depends_on.into_iter().collect(),
            metadata: options.metadata.unwrap_or(Value::Null),
            status: OperationStatus::Pending,
            next_attempt_at: now,
            last_error: None,
            batch_exempt: false,
        };

        let id = operation.id.clone();
        let priority = operation.priority;
        let position = state
            .operations
            .iter()
            .position(|op| op.priority < priority)
            .unwrap_or(state.operations.len());
        state.operations.insert(position, operation);
        state.stats.total += 1;

        debug!(queue = %self.config.name, id = %id, %kind, %priority, "Operation enqueued");
        self.events.emit(QueueEvent::Enqueued {
            id: id.clone(),
            kind,
            priority,
        });
        self.persist(&state).await;
        Ok(id)
    }

    fn make_room(&self, state: &mut QueueState, now: u64) -> Result<()> {
        self.purge_expired(state, now);
        if state.operations.len() < self.config.max_size {
            return Ok(());
        }

        // Low operations sit at the tail in FIFO order, so the first match is the oldest
        let victim = state
            .operations
            .iter()
            .position(|op| op.priority == Priority::Low && op.is_pending());
        match victim {
            Some(index) => {
                let evicted = state.operations.remove(index);
                warn!(queue = %self.config.name, id = %evicted.id, "Queue full, displaced oldest low-priority operation");
                self.events.emit(QueueEvent::Dequeued {
                    id: evicted.id,
                    reason: DequeueReason::Evicted,
                });
                Ok(())
            }
            None => Err(Error::ResourceExhausted(format!(
                "queue '{}' is full ({} operations)",
                self.config.name, self.config.max_size
            ))),
        }
    }

    /// Removes pending operations past their expiry. In-flight ones are
    /// left to finish.
    fn purge_expired(&self, state: &mut QueueState, now: u64) -> usize {
        let mut expired = Vec::new();
        state.operations.retain(|op| {
            if op.is_pending() && op.is_expired(now) {
                expired.push(op.id.clone());
                false
            } else {
                true
            }
        });

        for id in &expired {
            state.stats.expired += 1;
            debug!(queue = %self.config.name, id = %id, "Operation expired");
            self.events.emit(QueueEvent::Expired { id: id.clone() });
        }
        expired.len()
    }

    // == Dequeue ==
    /// Cancels a pending operation. In-flight or unknown ids return false.
    pub async fn dequeue(&self, id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(index) = state
            .operations
            .iter()
            .position(|op| op.id == id && op.is_pending())
        else {
            return false;
        };

        state.operations.remove(index);
        self.events.emit(QueueEvent::Dequeued {
            id: id.to_string(),
            reason: DequeueReason::Cancelled,
        });
        self.persist(&state).await;
        true
    }

    // == Inspection ==
    pub async fn get_message(&self, id: &str) -> Option<QueuedOperation> {
        let state = self.state.lock().await;
        state.operations.iter().find(|op| op.id == id).cloned()
    }

    /// Live operations matching `filter`, in dispatch order.
    pub async fn get_messages(&self, filter: &MessageFilter) -> Vec<QueuedOperation> {
        let state = self.state.lock().await;
        state
            .operations
            .iter()
            .filter(|op| filter.matches(op))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.operations.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.operations.is_empty()
    }

    // == Clear ==
    /// Drops every live operation. Calls already in flight still finish but
    /// their outcomes are discarded.
    pub async fn clear(&self) -> usize {
        let mut state = self.state.lock().await;
        let count = state.operations.len();
        state.operations.clear();
        info!(queue = %self.config.name, count, "Queue cleared");
        self.events.emit(QueueEvent::Cleared { count });
        self.persist(&state).await;
        count
    }

    // == Metrics ==
    pub async fn metrics(&self) -> QueueMetrics {
        let state = self.state.lock().await;
        let processing = state
            .operations
            .iter()
            .filter(|op| op.status == OperationStatus::Dispatching)
            .count();

        QueueMetrics {
            total_messages: state.stats.total,
            pending_messages: state.operations.len() - processing,
            processing_messages: processing,
            completed_messages: state.stats.completed,
            failed_messages: state.stats.failed,
            average_processing_time: state.stats.average_processing_time(),
            success_rate: state.stats.success_rate(),
            queue_size: state.operations.len(),
            expired_messages: state.stats.expired,
            retried_messages: state.stats.retried,
        }
    }

    // == Network ==
    pub async fn network_status(&self) -> NetworkStatus {
        self.state.lock().await.network.clone()
    }

    /// Records a network status change. Going from offline to online runs
    /// a tick immediately and returns its report.
    pub async fn set_network_status(&self, status: NetworkStatus) -> Option<TickReport> {
        let came_online = {
            let mut state = self.state.lock().await;
            if state.network == status {
                return None;
            }
            let was_online = state.network.online;
            state.network = status.clone();
            info!(queue = %self.config.name, online = status.online, "Network status changed");
            self.events.emit(QueueEvent::NetworkStatusChanged {
                status: status.clone(),
            });
            !was_online && status.online
        };

        if came_online {
            Some(self.process_tick().await)
        } else {
            None
        }
    }

    // == Process Tick ==
    /// Runs one scheduling round.
    ///
    /// Does nothing while offline. Otherwise purges expired operations,
    /// picks up to `batch_size` admissible ones (pending, past their retry
    /// time, unexpired, with no dependency still queued) in priority order,
    /// dispatches them concurrently and applies the outcomes.
    pub async fn process_tick(&self) -> TickReport {
        let mut report = TickReport::default();
        let now = self.clock.now_ms();

        let dispatches = {
            let mut state = self.state.lock().await;
            if !state.network.online {
                return report;
            }

            report.expired = self.purge_expired(&mut state, now);
            let selected = select_admissible(&state.operations, now, self.config.batch_size);
            if selected.is_empty() {
                if report.expired > 0 {
                    self.persist(&state).await;
                }
                return report;
            }

            let picked: Vec<QueuedOperation> = selected
                .into_iter()
                .map(|index| {
                    let op = &mut state.operations[index];
                    op.status = OperationStatus::Dispatching;
                    op.clone()
                })
                .collect();
            self.plan_dispatches(picked)
        };

        for dispatch in &dispatches {
            match dispatch {
                Dispatch::Single(_) => report.dispatched += 1,
                Dispatch::Batch(ops) => {
                    report.dispatched += ops.len();
                    report.batches += 1;
                }
            }
        }

        let outcomes = join_all(dispatches.into_iter().map(|d| self.run(d))).await;

        let mut state = self.state.lock().await;
        for outcome in outcomes {
            self.apply(&mut state, outcome, &mut report);
        }
        self.persist(&state).await;

        debug!(
            queue = %self.config.name,
            dispatched = report.dispatched,
            completed = report.completed,
            retried = report.retried,
            failed = report.failed,
            expired = report.expired,
            "Tick processed"
        );
        report
    }

    /// Groups same-target transport operations when batching is enabled and
    /// the transport executor can take batches.
    fn plan_dispatches(&self, picked: Vec<QueuedOperation>) -> Vec<Dispatch> {
        let batching = self.config.enable_batching
            && self
                .executors
                .get(&OperationKind::Transport)
                .is_some_and(|executor| executor.supports_batching());
        if !batching {
            return picked.into_iter().map(Dispatch::Single).collect();
        }

        let mut singles = Vec::new();
        let mut groups: Vec<(Target, Vec<QueuedOperation>)> = Vec::new();
        for op in picked {
            match op.target.clone().filter(|_| op.is_batchable()) {
                Some(target) => match groups.iter_mut().find(|(t, _)| *t == target) {
                    Some((_, members)) => members.push(op),
                    None => groups.push((target, vec![op])),
                },
                None => singles.push(Dispatch::Single(op)),
            }
        }

        for (_, mut members) in groups {
            if members.len() >= 2 {
                singles.push(Dispatch::Batch(members));
            } else if let Some(op) = members.pop() {
                singles.push(Dispatch::Single(op));
            }
        }
        singles
    }

    async fn run(&self, dispatch: Dispatch) -> Outcome {
        let started = self.clock.now_ms();
        match dispatch {
            Dispatch::Single(op) => {
                let result = match self.executors.get(&op.kind) {
                    Some(executor) => executor.execute(&op).await,
                    None => Err(ExecutionError::transient(format!(
                        "no executor registered for {} operations",
                        op.kind
                    ))),
                };
                Outcome::Single {
                    id: op.id,
                    result,
                    elapsed_ms: self.clock.now_ms().saturating_sub(started),
                }
            }
            Dispatch::Batch(ops) => {
                let result = match self.executors.get(&OperationKind::Transport) {
                    Some(executor) => executor.execute_batch(&ops).await,
                    None => Err(ExecutionError::transient(
                        "no executor registered for transport operations",
                    )),
                };
                Outcome::Batch {
                    ids: ops.into_iter().map(|op| op.id).collect(),
                    result,
                    elapsed_ms: self.clock.now_ms().saturating_sub(started),
                }
            }
        }
    }

    fn apply(&self, state: &mut QueueState, outcome: Outcome, report: &mut TickReport) {
        match outcome {
            Outcome::Single {
                id,
                result: Ok(result),
                elapsed_ms,
            } => self.complete(state, &id, result, elapsed_ms, report),
            Outcome::Single {
                id,
                result: Err(error),
                ..
            } => self.fail_attempt(state, &id, error, report),
            Outcome::Batch {
                ids,
                result: Ok(result),
                elapsed_ms,
            } => {
                for id in &ids {
                    self.complete(state, id, result.clone(), elapsed_ms, report);
                }
            }
            Outcome::Batch {
                ids,
                result: Err(error),
                ..
            } => {
                warn!(queue = %self.config.name, members = ids.len(), error = %error, "Batch failed, members will be sent individually");
                for op in state
                    .operations
                    .iter_mut()
                    .filter(|op| ids.contains(&op.id))
                {
                    op.status = OperationStatus::Pending;
                    op.batch_exempt = true;
                    op.last_error = Some(error.message.clone());
                    report.deferred += 1;
                }
            }
        }
    }

    fn complete(
        &self,
        state: &mut QueueState,
        id: &str,
        result: Value,
        elapsed_ms: u64,
        report: &mut TickReport,
    ) {
        let Some(index) = state.operations.iter().position(|op| op.id == id) else {
            return;
        };
        state.operations.remove(index);
        state.stats.record_completion(elapsed_ms);
        report.completed += 1;
        self.events.emit(QueueEvent::Processed {
            id: id.to_string(),
            result,
            duration_ms: elapsed_ms,
        });
    }

    fn fail_attempt(
        &self,
        state: &mut QueueState,
        id: &str,
        error: ExecutionError,
        report: &mut TickReport,
    ) {
        let now = self.clock.now_ms();
        let Some(index) = state.operations.iter().position(|op| op.id == id) else {
            return;
        };

        let op = &mut state.operations[index];
        op.attempts += 1;
        op.last_error = Some(error.message.clone());

        if !error.retryable || op.attempts >= op.max_attempts {
            let attempts = op.attempts;
            state.operations.remove(index);
            state.stats.failed += 1;
            report.failed += 1;
            warn!(queue = %self.config.name, id, attempts, error = %error, "Operation failed permanently");
            self.events.emit(QueueEvent::Failed {
                id: id.to_string(),
                attempts,
                error: error.message,
            });
            return;
        }

        let delay = self.backoff.delay(op.attempts);
        let delay_ms = duration_ms(delay);
        op.status = OperationStatus::Pending;
        op.next_attempt_at = now.saturating_add(delay_ms);
        let attempt = op.attempts;
        state.stats.retried += 1;
        report.retried += 1;
        debug!(queue = %self.config.name, id, attempt, delay_ms, "Retry scheduled");
        self.events.emit(QueueEvent::Retry {
            id: id.to_string(),
            attempt,
            delay_ms,
            error: error.message,
        });
    }

    // == Persistence ==
    /// Writes the live set. Failures are logged and the queue keeps
    /// running in memory.
    ///
    /// A failed write also drops the previous snapshot: it no longer
    /// matches the live set, and restoring it would revive operations that
    /// already left the queue.
    async fn persist(&self, state: &QueueState) {
        if !self.config.enable_persistence {
            return;
        }

        let snapshot = QueueSnapshot::new(state.operations.clone(), self.clock.now_ms());
        let value = match serde_json::to_value(&snapshot) {
            Ok(value) => value,
            Err(e) => {
                warn!(queue = %self.config.name, error = %e, "Queue snapshot encode failed");
                return;
            }
        };

        let options = SaveOptions {
            compress: true,
            ..SaveOptions::default()
        };
        if let Err(e) = self.persistence.save(&self.config.name, value, options).await {
            warn!(queue = %self.config.name, error = %e, "Queue snapshot write failed, continuing in memory");
            if let Err(e) = self.persistence.remove(&self.config.name).await {
                warn!(queue = %self.config.name, error = %e, "Stale queue snapshot could not be removed");
            }
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Indices of dispatchable operations, at most `limit`, in queue order.
fn select_admissible(operations: &[QueuedOperation], now: u64, limit: usize) -> Vec<usize> {
    let live: HashSet<&str> = operations.iter().map(|op| op.id.as_str()).collect();
    operations
        .iter()
        .enumerate()
        .filter(|(_, op)| {
            op.is_pending()
                && op.next_attempt_at <= now
                && !op.is_expired(now)
                && op.depends_on.iter().all(|dep| !live.contains(dep.as_str()))
        })
        .map(|(index, _)| index)
        .take(limit)
        .collect()
}
