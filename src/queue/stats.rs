//! Queue Statistics Module

use serde::Serialize;

use crate::metrics::RollingWindow;

/// Lifetime outcome counters plus a rolling window of processing times.
#[derive(Debug, Clone)]
pub struct QueueStats {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub expired: u64,
    pub retried: u64,
    processing_times: RollingWindow<u64>,
}

impl QueueStats {
    pub fn new(window: usize) -> Self {
        Self {
            total: 0,
            completed: 0,
            failed: 0,
            expired: 0,
            retried: 0,
            processing_times: RollingWindow::new(window),
        }
    }

    pub fn record_completion(&mut self, elapsed_ms: u64) {
        self.completed += 1;
        self.processing_times.push(elapsed_ms);
    }

    pub fn average_processing_time(&self) -> f64 {
        self.processing_times.mean()
    }

    /// Completed over terminal outcomes (completed + failed), 0.0 before any.
    pub fn success_rate(&self) -> f64 {
        let finished = self.completed + self.failed;
        if finished == 0 {
            0.0
        } else {
            self.completed as f64 / finished as f64
        }
    }
}

/// Point-in-time view returned by `OperationQueue::metrics`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMetrics {
    /// Operations ever accepted (enqueued or restored)
    pub total_messages: u64,
    pub pending_messages: usize,
    /// Operations currently dispatching
    pub processing_messages: usize,
    pub completed_messages: u64,
    pub failed_messages: u64,
    /// Mean over the recent completion window, in ms
    pub average_processing_time: f64,
    pub success_rate: f64,
    /// Live operations (pending + dispatching)
    pub queue_size: usize,
    pub expired_messages: u64,
    pub retried_messages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let mut stats = QueueStats::new(10);
        assert_eq!(stats.success_rate(), 0.0);

        stats.record_completion(10);
        stats.record_completion(30);
        stats.record_completion(20);
        stats.failed += 1;

        assert_eq!(stats.success_rate(), 0.75);
        assert_eq!(stats.average_processing_time(), 20.0);
    }

    #[test]
    fn test_processing_window_rolls() {
        let mut stats = QueueStats::new(2);
        stats.record_completion(100);
        stats.record_completion(10);
        stats.record_completion(20);

        assert_eq!(stats.completed, 3);
        assert_eq!(stats.average_processing_time(), 15.0);
    }
}
