//! Retry delay calculation

use std::time::Duration;

use rand::Rng;

use crate::config::QueueConfig;

/// Bounded exponential backoff with proportional jitter.
///
/// `delay(n) = min(base * 2^(n-1) * (1 + jitter), max)` where
/// `jitter` is drawn uniformly from `[0, max_jitter]`. With exponential
/// growth disabled the delay is `base * (1 + jitter)`, still capped.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    exponential: bool,
    max_jitter: f64,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, exponential: bool, max_jitter: f64) -> Self {
        Self {
            base,
            max,
            exponential,
            max_jitter: max_jitter.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(
            config.base_delay,
            config.max_delay,
            config.exponential_backoff,
            config.max_jitter,
        )
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter = if self.max_jitter > 0.0 {
            rand::thread_rng().gen_range(0.0..=self.max_jitter)
        } else {
            0.0
        };
        self.delay_with_jitter(attempt, jitter)
    }

    pub fn delay_with_jitter(&self, attempt: u32, jitter: f64) -> Duration {
        let base_ms = self.base.as_millis() as f64;
        let grown = if self.exponential {
            let exponent = attempt.saturating_sub(1).min(32) as i32;
            base_ms * 2f64.powi(exponent)
        } else {
            base_ms
        };

        let ms = (grown * (1.0 + jitter.clamp(0.0, self.max_jitter)))
            .min(self.max.as_millis() as f64);
        Duration::from_millis(ms as u64)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&QueueConfig::default())
    }
}
