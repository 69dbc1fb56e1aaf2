//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL, priority
//! and tag metadata.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::priority::Priority;

// == Cache Entry ==
/// A stored value and its bookkeeping.
///
/// `value` holds the stored representation (compressed when `compressed`
/// is set) and `size_bytes` always equals `value.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: String,
    /// Serialized (possibly compressed) payload
    pub value: Vec<u8>,
    pub size_bytes: usize,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last successful read (Unix milliseconds)
    pub last_accessed_at: u64,
    pub access_count: u64,
    /// Time-to-live in milliseconds, None = no expiration
    pub ttl_ms: Option<u64>,
    pub priority: Priority,
    pub compressed: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped at `now`.
    pub fn new(
        key: impl Into<String>,
        value: Vec<u8>,
        compressed: bool,
        now: u64,
        ttl_ms: Option<u64>,
    ) -> Self {
        Self {
            key: key.into(),
            size_bytes: value.len(),
            value,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            ttl_ms,
            priority: Priority::Normal,
            compressed,
            tags: BTreeSet::new(),
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

    // == Expiry ==
    /// Absolute expiry time, None when no TTL is set.
    pub fn expires_at(&self) -> Option<u64> {
        self.ttl_ms.map(|ttl| self.created_at.saturating_add(ttl))
    }

    /// Expired iff a TTL is set and `now > created_at + ttl`.
    ///
    /// Used both by lazy expiry on read and by the background sweep.
    pub fn is_expired(&self, now: u64) -> bool {
        match self.expires_at() {
            Some(expires) => now > expires,
            None => false,
        }
    }

    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired (TTL elapsed)
    /// - `Some(remaining_ms)` if the entry has TTL and hasn't expired
    /// - `None` if the entry has no TTL (never expires)
    pub fn ttl_remaining_ms(&self, now: u64) -> Option<u64> {
        self.expires_at()
            .map(|expires| expires.saturating_sub(now))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}
