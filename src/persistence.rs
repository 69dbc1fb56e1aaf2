//! Persistence Module
//!
//! Pluggable load/save/remove of named snapshots. The queue (and optionally
//! a cache) writes its state through a `PersistenceAdapter` so it can be
//! recovered after a restart. Failures are reported as
//! `Error::Persistence`; callers log them and keep running in memory.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use crate::cache::{BoundedCache, WriteOptions};
use crate::error::{Error, Result};

/// Hints passed along with a snapshot write.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// How long the snapshot stays valid, if the backend supports it
    pub ttl: Option<Duration>,
    /// Ask the backend to compress the stored form
    pub compress: bool,
}

/// Storage backend for named snapshots.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Returns the stored snapshot, or `None` if nothing was saved under `name`.
    async fn load(&self, name: &str) -> Result<Option<Value>>;

    async fn save(&self, name: &str, value: Value, options: SaveOptions) -> Result<()>;

    async fn remove(&self, name: &str) -> Result<()>;
}

// == Memory Persistence ==
/// Process-local adapter. Snapshots survive a queue being dropped and
/// rebuilt, not a process restart.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    snapshots: Mutex<HashMap<String, Value>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.snapshots.lock().await.len()
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryPersistence {
    async fn load(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.snapshots.lock().await.get(name).cloned())
    }

    async fn save(&self, name: &str, value: Value, _options: SaveOptions) -> Result<()> {
        self.snapshots.lock().await.insert(name.to_string(), value);
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.snapshots.lock().await.remove(name);
        Ok(())
    }
}

// == Cache Persistence ==
/// Adapter that keeps snapshots inside a dedicated `BoundedCache` instance.
///
/// Use a cache separate from the application data cache so snapshots are
/// not evicted by unrelated traffic.
#[derive(Debug, Clone)]
pub struct CachePersistence {
    cache: Arc<RwLock<BoundedCache>>,
    prefix: String,
}

impl CachePersistence {
    pub fn new(cache: Arc<RwLock<BoundedCache>>) -> Self {
        Self {
            cache,
            prefix: "snapshot:".to_string(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

#[async_trait]
impl PersistenceAdapter for CachePersistence {
    async fn load(&self, name: &str) -> Result<Option<Value>> {
        let mut cache = self.cache.write().await;
        Ok(cache.get::<Value>(&self.key(name)))
    }

    async fn save(&self, name: &str, value: Value, options: SaveOptions) -> Result<()> {
        let write = WriteOptions {
            ttl: options.ttl,
            force_compression: options.compress,
            ..WriteOptions::default()
        };

        let mut cache = self.cache.write().await;
        if cache.set(&self.key(name), &value, write) {
            Ok(())
        } else {
            Err(Error::Persistence(format!(
                "snapshot '{}' rejected by backing cache",
                name
            )))
        }
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let mut cache = self.cache.write().await;
        cache.delete(&self.key(name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_persistence_roundtrip() {
        let store = MemoryPersistence::new();
        assert!(store.load("queue").await.unwrap().is_none());

        store
            .save("queue", json!({"a": 1}), SaveOptions::default())
            .await
            .unwrap();
        assert_eq!(store.load("queue").await.unwrap(), Some(json!({"a": 1})));
        assert_eq!(store.len().await, 1);

        store.remove("queue").await.unwrap();
        assert!(store.load("queue").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_persistence_roundtrip() {
        let cache = Arc::new(RwLock::new(BoundedCache::new(CacheConfig::default())));
        let store = CachePersistence::new(cache.clone());

        let snapshot = json!({"operations": [1, 2, 3]});
        store
            .save(
                "queue",
                snapshot.clone(),
                SaveOptions {
                    compress: true,
                    ..SaveOptions::default()
                },
            )
            .await
            .unwrap();

        assert!(cache.read().await.has("snapshot:queue"));
        assert_eq!(store.load("queue").await.unwrap(), Some(snapshot));

        store.remove("queue").await.unwrap();
        assert!(store.load("queue").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_persistence_rejects_oversized_snapshot() {
        let config = CacheConfig {
            max_size: 100,
            enable_compression: false,
            ..CacheConfig::default()
        };
        let cache = Arc::new(RwLock::new(BoundedCache::new(config)));
        let store = CachePersistence::new(cache);

        let result = store
            .save("queue", json!("x".repeat(64)), SaveOptions::default())
            .await;
        assert!(matches!(result, Err(Error::Persistence(_))));
    }
}
