//! Configuration Module
//!
//! Handles loading and managing cache, queue and server configuration from
//! environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::EvictionStrategy;
use crate::error::{Error, Result};

// == Cache Config ==
/// Limits and behaviour of one `BoundedCache` instance.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Instance name, used in logs and snapshot names
    pub name: String,
    /// Byte budget across all stored entries
    pub max_size: usize,
    /// Maximum number of entries
    pub max_entries: usize,
    /// TTL applied when a write does not specify one
    pub default_ttl: Option<Duration>,
    /// Largest single stored entry; `None` means 10% of `max_size`
    pub max_entry_size: Option<usize>,
    /// Strategy used when capacity must be freed
    pub eviction_strategy: EvictionStrategy,
    pub enable_compression: bool,
    /// Serialized size above which values are compressed
    pub compression_threshold: usize,
    /// Number of recent `get` calls the hit rate is computed over
    pub metrics_window: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            max_size: 50 * 1024 * 1024,
            max_entries: 1000,
            default_ttl: None,
            max_entry_size: None,
            eviction_strategy: EvictionStrategy::Lru,
            enable_compression: true,
            compression_threshold: 1024,
            metrics_window: 1000,
        }
    }
}

impl CacheConfig {
    /// Loads cache settings from `CACHE_*` variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE` - Byte budget (default: 52428800)
    /// - `CACHE_MAX_ENTRIES` - Maximum entries (default: 1000)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in ms (default: none)
    /// - `CACHE_MAX_ENTRY_SIZE` - Largest single entry in bytes (default: 10% of max size)
    /// - `CACHE_EVICTION_STRATEGY` - lru/lfu/ttl/size/priority (default: lru)
    /// - `CACHE_COMPRESSION` - Enable compression (default: true)
    /// - `CACHE_COMPRESSION_THRESHOLD` - Bytes (default: 1024)
    /// - `CACHE_METRICS_WINDOW` - Rolling window length (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: defaults.name,
            max_size: env_or("CACHE_MAX_SIZE", defaults.max_size),
            max_entries: env_or("CACHE_MAX_ENTRIES", defaults.max_entries),
            default_ttl: env_parse::<u64>("CACHE_DEFAULT_TTL_MS").map(Duration::from_millis),
            max_entry_size: env_parse("CACHE_MAX_ENTRY_SIZE"),
            eviction_strategy: env_or("CACHE_EVICTION_STRATEGY", defaults.eviction_strategy),
            enable_compression: env_or("CACHE_COMPRESSION", defaults.enable_compression),
            compression_threshold: env_or(
                "CACHE_COMPRESSION_THRESHOLD",
                defaults.compression_threshold,
            ),
            metrics_window: env_or("CACHE_METRICS_WINDOW", defaults.metrics_window),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(Error::Validation("max_size must be > 0".into()));
        }
        if self.max_entries == 0 {
            return Err(Error::Validation("max_entries must be > 0".into()));
        }
        Ok(())
    }
}

// == Queue Config ==
/// Limits and retry policy of one `OperationQueue` instance.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Instance name, also the persistence snapshot name
    pub name: String,
    /// Maximum number of live operations
    pub max_size: usize,
    /// Maximum dispatches per tick
    pub batch_size: usize,
    /// Attempts granted to operations that do not specify their own
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// When false every retry waits `base_delay`
    pub exponential_backoff: bool,
    /// Upper bound of the random jitter fraction added to each delay
    pub max_jitter: f64,
    /// Expiry applied to operations that do not specify one
    pub default_expires_in: Option<Duration>,
    /// Coalesce same-target transport operations into one call
    pub enable_batching: bool,
    pub enable_persistence: bool,
    /// Number of recent completions the average processing time covers
    pub metrics_window: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: "operation-queue".to_string(),
            max_size: 1000,
            batch_size: 10,
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            exponential_backoff: true,
            max_jitter: 0.1,
            default_expires_in: None,
            enable_batching: false,
            enable_persistence: true,
            metrics_window: 100,
        }
    }
}

impl QueueConfig {
    /// Loads queue settings from `QUEUE_*` variables.
    ///
    /// # Environment Variables
    /// - `QUEUE_MAX_SIZE` - Capacity (default: 1000)
    /// - `QUEUE_BATCH_SIZE` - Dispatches per tick (default: 10)
    /// - `QUEUE_MAX_ATTEMPTS` - Default attempts (default: 3)
    /// - `QUEUE_BASE_DELAY_MS` - Backoff base (default: 1000)
    /// - `QUEUE_MAX_DELAY_MS` - Backoff cap (default: 30000)
    /// - `QUEUE_EXPONENTIAL_BACKOFF` - (default: true)
    /// - `QUEUE_DEFAULT_EXPIRES_MS` - Default expiry (default: none)
    /// - `QUEUE_BATCHING` - (default: false)
    /// - `QUEUE_PERSISTENCE` - (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: defaults.name,
            max_size: env_or("QUEUE_MAX_SIZE", defaults.max_size),
            batch_size: env_or("QUEUE_BATCH_SIZE", defaults.batch_size),
            max_attempts: env_or("QUEUE_MAX_ATTEMPTS", defaults.max_attempts),
            base_delay: Duration::from_millis(env_or(
                "QUEUE_BASE_DELAY_MS",
                defaults.base_delay.as_millis() as u64,
            )),
            max_delay: Duration::from_millis(env_or(
                "QUEUE_MAX_DELAY_MS",
                defaults.max_delay.as_millis() as u64,
            )),
            exponential_backoff: env_or("QUEUE_EXPONENTIAL_BACKOFF", defaults.exponential_backoff),
            max_jitter: defaults.max_jitter,
            default_expires_in: env_parse::<u64>("QUEUE_DEFAULT_EXPIRES_MS")
                .map(Duration::from_millis),
            enable_batching: env_or("QUEUE_BATCHING", defaults.enable_batching),
            enable_persistence: env_or("QUEUE_PERSISTENCE", defaults.enable_persistence),
            metrics_window: defaults.metrics_window,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(Error::Validation("max_size must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Validation("batch_size must be > 0".into()));
        }
        if self.max_attempts == 0 {
            return Err(Error::Validation("max_attempts must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.max_jitter) {
            return Err(Error::Validation("max_jitter must be within 0..=1".into()));
        }
        Ok(())
    }
}

// == Server Config ==
/// Top-level configuration for the inspection server binary.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Interval between background cache expiry sweeps
    pub cleanup_interval: Duration,
    /// Interval between queue scheduler ticks
    pub tick_interval: Duration,
    pub cache: CacheConfig,
    pub queue: QueueConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL_MS` - Cache sweep frequency (default: 60000)
    /// - `TICK_INTERVAL_MS` - Queue tick frequency (default: 1000)
    /// - plus the `CACHE_*` and `QUEUE_*` variables
    pub fn from_env() -> Self {
        Self {
            server_port: env_or("SERVER_PORT", 3000),
            cleanup_interval: Duration::from_millis(env_or("CLEANUP_INTERVAL_MS", 60_000)),
            tick_interval: Duration::from_millis(env_or("TICK_INTERVAL_MS", 1000)),
            cache: CacheConfig::from_env(),
            queue: QueueConfig::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cleanup_interval: Duration::from_millis(60_000),
            tick_interval: Duration::from_millis(1000),
            cache: CacheConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env_parse(name).unwrap_or(default)
}
