//! Cache Store Module
//!
//! Main cache engine: a byte-budgeted entry table with selectable eviction
//! strategies, optional compression and lazy/background TTL expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::compression::{Compressor, GzipCompressor};
use super::entry::CacheEntry;
use super::events::CacheEvent;
use super::eviction::{EvictionStrategy, Slot};
use super::stats::{compression_ratio, CacheMetrics, CacheStats};
use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::events::EventBus;
use crate::priority::Priority;

// == Write Options ==
/// Per-write settings for `BoundedCache::set`.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Overrides the configured default TTL
    pub ttl: Option<Duration>,
    pub priority: Priority,
    pub tags: Vec<String>,
    /// Compress regardless of size or the compression switch
    pub force_compression: bool,
}

impl WriteOptions {
    pub fn ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

// == Bounded Cache ==
/// Byte- and count-bounded cache.
///
/// `total_size` and `compressed_size` are maintained incrementally on
/// every insert and removal; only `audit` recomputes them.
#[derive(Debug)]
pub struct BoundedCache {
    config: CacheConfig,
    entries: HashMap<String, Slot>,
    total_size: usize,
    compressed_size: usize,
    stats: CacheStats,
    compressor: Arc<dyn Compressor>,
    clock: Arc<dyn Clock>,
    events: EventBus<CacheEvent>,
    next_seq: u64,
    next_tick: u64,
}

impl BoundedCache {
    // == Constructor ==
    /// Creates a cache on the system clock with gzip compression.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            stats: CacheStats::new(config.metrics_window),
            config,
            entries: HashMap::new(),
            total_size: 0,
            compressed_size: 0,
            compressor: Arc::new(GzipCompressor::default()),
            clock,
            events: EventBus::new(),
            next_seq: 0,
            next_tick: 0,
        }
    }

    /// Swaps the compression codec.
    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    // == Set ==
    /// Serializes and stores `value` under `key`.
    ///
    /// Returns false without mutating anything when the value cannot be
    /// serialized, when the stored form alone exceeds the single-entry
    /// limit (10% of the byte budget unless `max_entry_size` is set), or
    /// when eviction cannot free enough room.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T, options: WriteOptions) -> bool {
        let raw = match serde_json::to_vec(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(cache = %self.config.name, key, error = %e, "Value could not be serialized");
                return false;
            }
        };

        let (stored, compressed) = self.encode(raw, options.force_compression);
        let now = self.clock.now_ms();
        let ttl_ms = options
            .ttl
            .or(self.config.default_ttl)
            .map(|ttl| u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));

        let entry = CacheEntry::new(key, stored, compressed, now, ttl_ms)
            .with_priority(options.priority)
            .with_tags(options.tags);
        let tick = self.next_access_tick();

        self.admit(entry, tick)
    }

    fn exceeds_entry_limit(&self, size: usize) -> bool {
        match self.config.max_entry_size {
            Some(limit) => size > limit.min(self.config.max_size),
            None => size.saturating_mul(10) > self.config.max_size,
        }
    }

    /// Inserts a prepared entry, evicting as needed. All-or-nothing.
    pub(super) fn admit(&mut self, entry: CacheEntry, access_tick: u64) -> bool {
        let size = entry.size_bytes;
        if self.exceeds_entry_limit(size) {
            debug!(
                cache = %self.config.name,
                key = %entry.key,
                size,
                "Rejected entry larger than the single-entry limit"
            );
            return false;
        }

        let replaced = self.entries.get(&entry.key).map(|slot| slot.entry.size_bytes);
        let needs_slot = replaced.is_none() && self.entries.len() >= self.config.max_entries;
        let projected = self.total_size - replaced.unwrap_or(0) + size;

        let Some(victims) = self.plan_eviction(&entry.key, usize::from(needs_slot), projected)
        else {
            warn!(
                cache = %self.config.name,
                key = %entry.key,
                "Eviction cannot free enough room, write dropped"
            );
            return false;
        };

        let strategy = self.config.eviction_strategy;
        for key in victims {
            self.remove_slot(&key);
            self.stats.record_eviction();
            debug!(cache = %self.config.name, key = %key, %strategy, "Evicted entry");
            self.events.emit(CacheEvent::Evicted { key, strategy });
        }

        self.remove_slot(&entry.key);
        let event = CacheEvent::Set {
            key: entry.key.clone(),
            size_bytes: size,
            compressed: entry.compressed,
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        self.insert_slot(Slot {
            entry,
            seq,
            access_tick,
        });
        self.events.emit(event);
        true
    }

    /// Picks victims so that at least `min_victims` go and the projected
    /// size fits the budget. None if that is impossible.
    fn plan_eviction(
        &self,
        protected: &str,
        min_victims: usize,
        mut projected: usize,
    ) -> Option<Vec<String>> {
        let max_size = self.config.max_size;
        if min_victims == 0 && projected <= max_size {
            return Some(Vec::new());
        }

        let candidates = self
            .config
            .eviction_strategy
            .order(self.entries.values().filter(|slot| slot.entry.key != protected));

        let mut victims = Vec::new();
        for slot in candidates {
            if victims.len() >= min_victims && projected <= max_size {
                break;
            }
            projected = projected.saturating_sub(slot.entry.size_bytes);
            victims.push(slot.entry.key.clone());
        }

        (victims.len() >= min_victims && projected <= max_size).then_some(victims)
    }

    fn encode(&self, raw: Vec<u8>, force: bool) -> (Vec<u8>, bool) {
        let wanted = force
            || (self.config.enable_compression && raw.len() > self.config.compression_threshold);
        if !wanted {
            return (raw, false);
        }

        match self.compressor.compress(&raw) {
            Ok(packed) if force || packed.len() < raw.len() => (packed, true),
            Ok(_) => (raw, false),
            Err(e) => {
                warn!(cache = %self.config.name, error = %e, "Compression failed, storing raw");
                (raw, false)
            }
        }
    }

    fn unpack(&self, entry: &CacheEntry) -> Result<Vec<u8>> {
        if entry.compressed {
            self.compressor.decompress(&entry.value)
        } else {
            Ok(entry.value.clone())
        }
    }

    // == Get ==
    /// Retrieves and deserializes the value stored under `key`.
    ///
    /// Expired entries are removed and counted as misses. An entry that
    /// fails to decompress is dropped and reported as a miss.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let now = self.clock.now_ms();
        let expired = match self.entries.get(key) {
            Some(slot) => slot.entry.is_expired(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.expire(key);
            self.stats.record_miss();
            return None;
        }

        let tick = self.next_access_tick();
        let unpacked = {
            let slot = self.entries.get_mut(key)?;
            slot.entry.access_count += 1;
            slot.entry.last_accessed_at = now;
            slot.access_tick = tick;
            if slot.entry.compressed {
                self.compressor.decompress(&slot.entry.value)
            } else {
                Ok(slot.entry.value.clone())
            }
        };

        let bytes = match unpacked {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(cache = %self.config.name, key, error = %e, "Dropping corrupt entry");
                self.remove_slot(key);
                self.events.emit(CacheEvent::Deleted {
                    key: key.to_string(),
                });
                self.stats.record_miss();
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                self.stats.record_hit();
                Some(value)
            }
            Err(e) => {
                warn!(cache = %self.config.name, key, error = %e, "Stored value does not match requested type");
                self.stats.record_miss();
                None
            }
        }
    }

    // == Has ==
    /// True if a live (unexpired) entry exists. Touches no statistics.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .is_some_and(|slot| !slot.entry.is_expired(now))
    }

    /// Live entry metadata without counting an access.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .map(|slot| &slot.entry)
            .filter(|entry| !entry.is_expired(now))
    }

    // == Delete ==
    pub fn delete(&mut self, key: &str) -> bool {
        if self.remove_slot(key).is_some() {
            self.events.emit(CacheEvent::Deleted {
                key: key.to_string(),
            });
            true
        } else {
            false
        }
    }

    // == Clear ==
    pub fn clear(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        self.total_size = 0;
        self.compressed_size = 0;
        self.events.emit(CacheEvent::Cleared { count });
    }

    // == Tags ==
    /// Live values carrying `tag`, in insertion order. Entries that fail to
    /// decode are skipped.
    pub fn get_by_tag<T: DeserializeOwned>(&self, tag: &str) -> Vec<(String, T)> {
        let now = self.clock.now_ms();
        let mut slots: Vec<&Slot> = self
            .entries
            .values()
            .filter(|slot| slot.entry.has_tag(tag) && !slot.entry.is_expired(now))
            .collect();
        slots.sort_by_key(|slot| slot.seq);

        slots
            .into_iter()
            .filter_map(|slot| {
                let bytes = self.unpack(&slot.entry).ok()?;
                let value = serde_json::from_slice(&bytes).ok()?;
                Some((slot.entry.key.clone(), value))
            })
            .collect()
    }

    /// Removes every entry carrying `tag`. Returns how many were removed.
    pub fn delete_by_tag(&mut self, tag: &str) -> usize {
        let keys: Vec<String> = self
            .entries
            .values()
            .filter(|slot| slot.entry.has_tag(tag))
            .map(|slot| slot.entry.key.clone())
            .collect();

        keys.iter().filter(|key| self.delete(key)).count()
    }

    // == Evict ==
    /// Removes up to `count` entries in `strategy` order. Returns the number
    /// actually removed.
    pub fn evict(&mut self, count: usize, strategy: EvictionStrategy) -> usize {
        let victims: Vec<String> = strategy
            .order(self.entries.values())
            .into_iter()
            .take(count)
            .map(|slot| slot.entry.key.clone())
            .collect();

        for key in &victims {
            self.remove_slot(key);
            self.stats.record_eviction();
            self.events.emit(CacheEvent::Evicted {
                key: key.clone(),
                strategy,
            });
        }

        if !victims.is_empty() {
            debug!(cache = %self.config.name, count = victims.len(), %strategy, "Manual eviction");
        }
        victims.len()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired: Vec<String> = self
            .entries
            .values()
            .filter(|slot| slot.entry.is_expired(now))
            .map(|slot| slot.entry.key.clone())
            .collect();

        for key in &expired {
            self.expire(key);
        }
        expired.len()
    }

    fn expire(&mut self, key: &str) {
        if self.remove_slot(key).is_some() {
            self.stats.record_expiration();
            self.events.emit(CacheEvent::Expired {
                key: key.to_string(),
            });
        }
    }

    // == Audit ==
    /// Recomputes the running totals by full scan. Returns true if they
    /// had drifted (and were corrected).
    pub fn audit(&mut self) -> bool {
        let total: usize = self.entries.values().map(|s| s.entry.size_bytes).sum();
        let compressed: usize = self
            .entries
            .values()
            .filter(|s| s.entry.compressed)
            .map(|s| s.entry.size_bytes)
            .sum();

        let drifted = total != self.total_size || compressed != self.compressed_size;
        if drifted {
            warn!(
                cache = %self.config.name,
                tracked = self.total_size,
                actual = total,
                "Size accounting drift corrected"
            );
            self.total_size = total;
            self.compressed_size = compressed;
        }
        drifted
    }

    // == Metrics ==
    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            total_size: self.total_size,
            entry_count: self.entries.len(),
            max_size: self.config.max_size,
            max_entries: self.config.max_entries,
            hit_rate: self.stats.hit_rate(),
            miss_rate: self.stats.miss_rate(),
            compression_ratio: compression_ratio(self.compressed_size, self.total_size),
            hits: self.stats.hits,
            misses: self.stats.misses,
            evictions: self.stats.evictions,
            expirations: self.stats.expirations,
        }
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Internal Helpers ==
    pub(super) fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub(super) fn emit(&self, event: CacheEvent) {
        self.events.emit(event);
    }

    pub(super) fn next_access_tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    /// Entries in insertion order.
    pub(super) fn entries_in_order(&self) -> Vec<&CacheEntry> {
        let mut slots: Vec<&Slot> = self.entries.values().collect();
        slots.sort_by_key(|slot| slot.seq);
        slots.into_iter().map(|slot| &slot.entry).collect()
    }

    fn insert_slot(&mut self, slot: Slot) {
        self.total_size += slot.entry.size_bytes;
        if slot.entry.compressed {
            self.compressed_size += slot.entry.size_bytes;
        }
        self.entries.insert(slot.entry.key.clone(), slot);
    }

    fn remove_slot(&mut self, key: &str) -> Option<Slot> {
        let slot = self.entries.remove(key)?;
        self.total_size -= slot.entry.size_bytes;
        if slot.entry.compressed {
            self.compressed_size -= slot.entry.size_bytes;
        }
        Some(slot)
    }
}
