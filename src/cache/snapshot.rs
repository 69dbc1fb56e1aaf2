//! Cache snapshot export/import and adapter-backed persistence

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::entry::CacheEntry;
use super::events::CacheEvent;
use super::store::BoundedCache;
use crate::error::{Error, Result};
use crate::persistence::{PersistenceAdapter, SaveOptions};

/// Envelope format version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub exported_at: DateTime<Utc>,
    pub version: u32,
    pub entry_count: usize,
    pub total_size: usize,
}

/// Versioned export of every entry, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub metadata: SnapshotMetadata,
    pub entries: Vec<CacheEntry>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Keep existing entries (imported keys overwrite them)
    pub merge: bool,
}

impl BoundedCache {
    // == Export ==
    pub fn export(&self) -> CacheSnapshot {
        let entries: Vec<CacheEntry> = self.entries_in_order().into_iter().cloned().collect();
        let exported_at = DateTime::from_timestamp_millis(self.now_ms() as i64).unwrap_or_default();

        CacheSnapshot {
            metadata: SnapshotMetadata {
                exported_at,
                version: SNAPSHOT_VERSION,
                entry_count: entries.len(),
                total_size: self.total_size(),
            },
            entries,
        }
    }

    // == Import ==
    /// Loads a snapshot. Without `merge` the cache is cleared first.
    ///
    /// The envelope is validated before anything is touched; a malformed
    /// one is an `Error::Validation`. Expired entries are skipped and
    /// capacity limits apply as for ordinary writes. Returns the number of
    /// entries imported.
    pub fn import(&mut self, snapshot: CacheSnapshot, options: ImportOptions) -> Result<usize> {
        validate_snapshot(&snapshot)?;

        if !options.merge {
            self.clear();
        }

        let now = self.now_ms();
        let entries = snapshot.entries;

        // Rebuild LRU order from the recorded access times
        let mut by_access: Vec<usize> = (0..entries.len()).collect();
        by_access.sort_by_key(|&i| entries[i].last_accessed_at);
        let mut ticks = vec![0; entries.len()];
        for i in by_access {
            ticks[i] = self.next_access_tick();
        }

        let mut imported = 0;
        for (entry, tick) in entries.into_iter().zip(ticks) {
            if entry.is_expired(now) {
                continue;
            }
            let key = entry.key.clone();
            if self.admit(entry, tick) {
                imported += 1;
            } else {
                warn!(cache = %self.config().name, key = %key, "Snapshot entry rejected on import");
            }
        }

        self.emit(CacheEvent::Imported { count: imported });
        info!(cache = %self.config().name, imported, "Cache snapshot imported");
        Ok(imported)
    }

    /// Parses a JSON envelope and imports it.
    pub fn import_json(&mut self, json: &str, options: ImportOptions) -> Result<usize> {
        let snapshot: CacheSnapshot = serde_json::from_str(json)?;
        self.import(snapshot, options)
    }
}

fn validate_snapshot(snapshot: &CacheSnapshot) -> Result<()> {
    if snapshot.metadata.version != SNAPSHOT_VERSION {
        return Err(Error::Validation(format!(
            "unsupported snapshot version: {}",
            snapshot.metadata.version
        )));
    }
    if snapshot.metadata.entry_count != snapshot.entries.len() {
        return Err(Error::Validation(format!(
            "snapshot declares {} entries but carries {}",
            snapshot.metadata.entry_count,
            snapshot.entries.len()
        )));
    }
    let mut seen = HashSet::with_capacity(snapshot.entries.len());
    if let Some(dup) = snapshot.entries.iter().find(|e| !seen.insert(e.key.as_str())) {
        return Err(Error::Validation(format!(
            "snapshot carries key '{}' more than once",
            dup.key
        )));
    }
    if let Some(bad) = snapshot
        .entries
        .iter()
        .find(|e| e.key.is_empty() || e.size_bytes != e.value.len())
    {
        return Err(Error::Validation(format!(
            "malformed snapshot entry '{}'",
            bad.key
        )));
    }
    Ok(())
}

fn snapshot_name(cache: &BoundedCache) -> String {
    format!("cache:{}", cache.config().name)
}

// == Adapter Persistence ==
/// Writes the cache's snapshot through `adapter`. Returns the entry count.
pub async fn persist_cache(
    cache: &RwLock<BoundedCache>,
    adapter: &dyn PersistenceAdapter,
) -> Result<usize> {
    let (name, snapshot) = {
        let guard = cache.read().await;
        (snapshot_name(&guard), guard.export())
    };
    let count = snapshot.entries.len();
    let value = serde_json::to_value(&snapshot)
        .map_err(|e| Error::Persistence(format!("snapshot encode failed: {}", e)))?;

    adapter
        .save(
            &name,
            value,
            SaveOptions {
                compress: true,
                ..SaveOptions::default()
            },
        )
        .await?;
    Ok(count)
}

/// Replaces the cache contents with the last persisted snapshot, if any.
pub async fn restore_cache(
    cache: &RwLock<BoundedCache>,
    adapter: &dyn PersistenceAdapter,
) -> Result<usize> {
    let name = snapshot_name(&*cache.read().await);
    let Some(value) = adapter.load(&name).await? else {
        return Ok(0);
    };

    let snapshot: CacheSnapshot = serde_json::from_value(value)?;
    cache.write().await.import(snapshot, ImportOptions::default())
}
