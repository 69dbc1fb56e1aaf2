//! Cache Statistics Module
//!
//! Hit/miss accounting plus lifetime eviction and expiration counters,
//! and the derived `CacheMetrics` view.
//! Hit and miss rates cover a rolling window of the most recent `get` calls.

use serde::Serialize;

use crate::metrics::RollingWindow;

// == Cache Stats ==
/// Counters updated incrementally by the cache.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found, expired or corrupt)
    pub misses: u64,
    /// Number of entries evicted to satisfy capacity
    pub evictions: u64,
    /// Number of entries removed because their TTL elapsed
    pub expirations: u64,
    window: RollingWindow<bool>,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new(window: usize) -> Self {
        Self {
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
            window: RollingWindow::new(window),
        }
    }

    // == Hit Rate ==
    /// Hit rate over the rolling window, 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        self.window.ratio()
    }

    /// Miss rate over the rolling window, 0.0 if no requests have been made.
    pub fn miss_rate(&self) -> f64 {
        if self.window.is_empty() {
            0.0
        } else {
            1.0 - self.window.ratio()
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
        self.window.push(true);
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
        self.window.push(false);
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }
}

// == Cache Metrics ==
/// Point-in-time metrics report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetrics {
    pub total_size: usize,
    pub entry_count: usize,
    pub max_size: usize,
    pub max_entries: usize,
    pub hit_rate: f64,
    pub miss_rate: f64,
    /// Compressed bytes divided by total stored bytes
    pub compression_ratio: f64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// `compressed_bytes / total_bytes`, 0.0 for an empty cache.
pub fn compression_ratio(compressed_bytes: usize, total_bytes: usize) -> f64 {
    if total_bytes == 0 {
        0.0
    } else {
        compressed_bytes as f64 / total_bytes as f64
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new(10);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.miss_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new(10);
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.5);
        assert_eq!(stats.miss_rate(), 0.5);
    }

    #[test]
    fn test_hit_rate_is_rolling() {
        let mut stats = CacheStats::new(2);
        stats.record_miss();
        stats.record_miss();
        stats.record_hit();
        stats.record_hit();

        // Only the last two calls count, lifetime counters keep everything
        assert_eq!(stats.hit_rate(), 1.0);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 2);
    }

    #[test]
    fn test_record_eviction_and_expiration() {
        let mut stats = CacheStats::new(10);
        stats.record_eviction();
        stats.record_eviction();
        stats.record_expiration();
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.expirations, 1);
    }

    #[test]
    fn test_compression_ratio() {
        assert_eq!(compression_ratio(0, 0), 0.0);
        assert_eq!(compression_ratio(25, 100), 0.25);
    }
}
