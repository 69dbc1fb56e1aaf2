//! Cache Module
//!
//! Provides a bounded in-memory cache with TTL expiration, selectable
//! eviction strategies, optional compression, tagging and metrics.

mod compression;
mod entry;
mod events;
mod eviction;
mod snapshot;
mod stats;
mod store;


// Re-export public types
pub use compression::{Compressor, GzipCompressor};
pub use entry::CacheEntry;
pub use events::CacheEvent;
pub use eviction::EvictionStrategy;
pub use snapshot::{
    persist_cache, restore_cache, CacheSnapshot, ImportOptions, SnapshotMetadata,
    SNAPSHOT_VERSION,
};
pub use stats::{CacheMetrics, CacheStats};
pub use store::{BoundedCache, WriteOptions};
