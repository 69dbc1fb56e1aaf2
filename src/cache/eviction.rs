//! Eviction Module
//!
//! Candidate ordering for each eviction strategy. The first candidate in
//! the returned order is evicted first.

use std::cmp::{Ordering, Reverse};

use serde::{Deserialize, Serialize};

use super::entry::CacheEntry;

// == Eviction Strategy ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionStrategy {
    /// Least recently read first
    #[default]
    Lru,
    /// Fewest reads first
    Lfu,
    /// Soonest expiry first; entries without TTL last
    Ttl,
    /// Largest first
    Size,
    /// Lowest priority first
    Priority,
}

impl std::fmt::Display for EvictionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvictionStrategy::Lru => write!(f, "lru"),
            EvictionStrategy::Lfu => write!(f, "lfu"),
            EvictionStrategy::Ttl => write!(f, "ttl"),
            EvictionStrategy::Size => write!(f, "size"),
            EvictionStrategy::Priority => write!(f, "priority"),
        }
    }
}

impl std::str::FromStr for EvictionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lru" => Ok(EvictionStrategy::Lru),
            "lfu" => Ok(EvictionStrategy::Lfu),
            "ttl" => Ok(EvictionStrategy::Ttl),
            "size" => Ok(EvictionStrategy::Size),
            "priority" => Ok(EvictionStrategy::Priority),
            _ => Err(format!("Unknown eviction strategy: {}", s)),
        }
    }
}

// == Slot ==
/// An entry plus the logical counters used to order it.
///
/// `seq` is the insertion order and breaks ties for every strategy.
/// `access_tick` increases on every read so LRU stays strict even when
/// several reads land in the same millisecond.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub entry: CacheEntry,
    pub seq: u64,
    pub access_tick: u64,
}

impl EvictionStrategy {
    /// Compares two slots; `Less` means `a` is evicted before `b`.
    pub(crate) fn compare(self, a: &Slot, b: &Slot) -> Ordering {
        let primary = match self {
            EvictionStrategy::Lru => a.access_tick.cmp(&b.access_tick),
            EvictionStrategy::Lfu => a.entry.access_count.cmp(&b.entry.access_count),
            EvictionStrategy::Ttl => ttl_deadline(&a.entry).cmp(&ttl_deadline(&b.entry)),
            EvictionStrategy::Size => Reverse(a.entry.size_bytes).cmp(&Reverse(b.entry.size_bytes)),
            EvictionStrategy::Priority => a.entry.priority.rank().cmp(&b.entry.priority.rank()),
        };
        primary.then_with(|| a.seq.cmp(&b.seq))
    }

    /// Orders candidates, eviction-first.
    pub(crate) fn order<'a, I>(self, slots: I) -> Vec<&'a Slot>
    where
        I: IntoIterator<Item = &'a Slot>,
    {
        let mut candidates: Vec<&Slot> = slots.into_iter().collect();
        candidates.sort_by(|a, b| self.compare(a, b));
        candidates
    }
}

fn ttl_deadline(entry: &CacheEntry) -> u64 {
    entry.expires_at().unwrap_or(u64::MAX)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::priority::Priority;

    fn slot(key: &str, seq: u64) -> Slot {
        Slot {
            entry: CacheEntry::new(key, vec![0; 8], false, 0, None),
            seq,
            access_tick: seq,
        }
    }

    fn keys(order: Vec<&Slot>) -> Vec<String> {
        order.into_iter().map(|s| s.entry.key.clone()).collect()
    }

    #[test]
    fn test_lru_orders_by_access_tick() {
        let mut a = slot("a", 0);
        let b = slot("b", 1);
        let c = slot("c", 2);
        a.access_tick = 3;

        let order = EvictionStrategy::Lru.order([&a, &b, &c]);
        assert_eq!(keys(order), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_lfu_ties_break_by_insertion() {
        let mut a = slot("a", 0);
        let b = slot("b", 1);
        let c = slot("c", 2);
        a.entry.access_count = 5;

        let order = EvictionStrategy::Lfu.order([&c, &a, &b]);
        assert_eq!(keys(order), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_ttl_puts_unbounded_last() {
        let mut a = slot("a", 0);
        let mut b = slot("b", 1);
        let c = slot("c", 2);
        a.entry.ttl_ms = Some(5_000);
        b.entry.ttl_ms = Some(1_000);

        let order = EvictionStrategy::Ttl.order([&a, &b, &c]);
        assert_eq!(keys(order), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_size_largest_first() {
        let a = slot("a", 0);
        let mut b = slot("b", 1);
        b.entry.size_bytes = 64;

        let order = EvictionStrategy::Size.order([&a, &b]);
        assert_eq!(keys(order), vec!["b", "a"]);
    }

    #[test]
    fn test_priority_lowest_first() {
        let mut x = slot("x", 1);
        let mut y = slot("y", 0);
        x.entry.priority = Priority::Low;
        y.entry.priority = Priority::Critical;

        let order = EvictionStrategy::Priority.order([&y, &x]);
        assert_eq!(keys(order), vec!["x", "y"]);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("LFU".parse::<EvictionStrategy>().unwrap(), EvictionStrategy::Lfu);
        assert!("fifo".parse::<EvictionStrategy>().is_err());
    }
}
