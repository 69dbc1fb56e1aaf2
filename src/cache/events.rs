//! Cache change events

use serde::Serialize;

use super::eviction::EvictionStrategy;

/// Emitted on every mutation of a `BoundedCache`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CacheEvent {
    Set {
        key: String,
        size_bytes: usize,
        compressed: bool,
    },
    Deleted {
        key: String,
    },
    Evicted {
        key: String,
        strategy: EvictionStrategy,
    },
    Expired {
        key: String,
    },
    Cleared {
        count: usize,
    },
    Imported {
        count: usize,
    },
}
