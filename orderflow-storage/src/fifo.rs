//! Bounded FIFO cache.
//!
//! A key map paired with a queue of keys in insertion order, both behind one
//! `RwLock` so they can never diverge. Eviction pops the front of the queue.
//! Reads and in-place updates do not move a key, so this is FIFO, not LRU.

use crate::traits::{CacheStats, OrderCache};
use orderflow_core::{Order, DEFAULT_CACHE_MAX_ENTRIES};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct Entries {
    by_key: HashMap<String, Order>,
    /// Oldest first. Holds each live key exactly once.
    order: VecDeque<String>,
}

impl Entries {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            by_key: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Insert or replace in place. Returns true when the key is new.
    fn upsert(&mut self, order: Order) -> bool {
        match self.by_key.entry(order.order_uid.clone()) {
            Entry::Occupied(mut slot) => {
                slot.insert(order);
                false
            }
            Entry::Vacant(slot) => {
                self.order.push_back(slot.key().clone());
                slot.insert(order);
                true
            }
        }
    }

    /// Drop the oldest entry.
    fn pop_oldest(&mut self) -> Option<String> {
        let key = self.order.pop_front()?;
        self.by_key.remove(&key);
        Some(key)
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Fixed-capacity order cache with first-in first-out eviction.
#[derive(Debug)]
pub struct FifoCache {
    entries: RwLock<Entries>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl FifoCache {
    /// Cache holding up to the default number of entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_MAX_ENTRIES)
    }

    /// Cache holding up to `max_entries`. Zero falls back to the default.
    pub fn with_capacity(max_entries: usize) -> Self {
        let max_entries = if max_entries == 0 {
            DEFAULT_CACHE_MAX_ENTRIES
        } else {
            max_entries
        };
        Self {
            entries: RwLock::new(Entries::with_capacity(max_entries)),
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Capacity fixed at construction.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Keys oldest first.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().order.iter().cloned().collect()
    }
}

impl Default for FifoCache {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderCache for FifoCache {
    fn get(&self, key: &str) -> Option<Order> {
        let found = self.entries.read().by_key.get(key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    fn set(&self, order: Order) {
        let mut entries = self.entries.write();
        if entries.upsert(order) && entries.len() > self.max_entries {
            if let Some(evicted) = entries.pop_oldest() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(order_uid = %evicted, "evicted oldest cache entry");
            }
        }
    }

    fn load(&self, orders: Vec<Order>) {
        // Walk newest first so a repeated key sits at its last position.
        // Dropped heads do not count as evictions.
        let keep = self.max_entries.min(orders.len());
        let mut seen = HashSet::with_capacity(keep);
        let mut tail = Vec::with_capacity(keep);
        for order in orders.into_iter().rev() {
            if tail.len() == self.max_entries {
                break;
            }
            if seen.insert(order.order_uid.clone()) {
                tail.push(order);
            }
        }

        let mut fresh = Entries::with_capacity(tail.len());
        for order in tail.into_iter().rev() {
            fresh.upsert(order);
        }
        *self.entries.write() = fresh;
    }

    fn size(&self) -> usize {
        self.entries.read().len()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.size() as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn order(uid: &str, marker: &str) -> Order {
        Order {
            order_uid: uid.to_string(),
            track_number: marker.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_capacity_uses_default() {
        assert_eq!(FifoCache::with_capacity(0).max_entries(), 1000);
        assert_eq!(FifoCache::new().max_entries(), 1000);
        assert_eq!(FifoCache::with_capacity(7).max_entries(), 7);
    }

    #[test]
    fn test_get_missing() {
        let cache = FifoCache::with_capacity(2);
        assert!(cache.get("A").is_none());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_set_then_get() {
        let cache = FifoCache::with_capacity(2);
        cache.set(order("A", "a1"));
        assert_eq!(cache.get("A").map(|o| o.track_number), Some("a1".to_string()));
    }

    #[test]
    fn test_fifo_eviction() {
        let cache = FifoCache::with_capacity(2);
        cache.set(order("A", "a"));
        cache.set(order("B", "b"));
        cache.set(order("C", "c"));

        assert!(cache.get("A").is_none());
        assert!(cache.get("B").is_some());
        assert!(cache.get("C").is_some());
        assert_eq!(cache.size(), 2);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_update_does_not_evict() {
        let cache = FifoCache::with_capacity(2);
        cache.set(order("A", "a1"));
        cache.set(order("B", "b1"));
        cache.set(order("A", "a2"));

        assert_eq!(cache.size(), 2);
        assert_eq!(cache.get("A").map(|o| o.track_number), Some("a2".to_string()));
        assert!(cache.get("B").is_some());
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_update_keeps_position() {
        let cache = FifoCache::with_capacity(2);
        cache.set(order("A", "a1"));
        cache.set(order("B", "b1"));
        cache.set(order("A", "a2"));
        // A is still the oldest, so it goes first.
        cache.set(order("C", "c1"));

        assert!(cache.get("A").is_none());
        assert_eq!(cache.keys(), vec!["B".to_string(), "C".to_string()]);
    }

    #[test]
    fn test_reads_do_not_refresh_position() {
        let cache = FifoCache::with_capacity(2);
        cache.set(order("A", "a"));
        cache.set(order("B", "b"));
        for _ in 0..10 {
            let _ = cache.get("A");
        }
        cache.set(order("C", "c"));
        assert!(cache.get("A").is_none());
    }

    #[test]
    fn test_load_truncates_to_tail() {
        let cache = FifoCache::with_capacity(2);
        cache.load(vec![order("R1", "1"), order("R2", "2"), order("R3", "3")]);

        assert!(cache.get("R1").is_none());
        assert!(cache.get("R2").is_some());
        assert!(cache.get("R3").is_some());
        assert_eq!(cache.size(), 2);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_load_replaces_previous_contents() {
        let cache = FifoCache::with_capacity(4);
        cache.set(order("OLD", "x"));
        cache.load(vec![order("N1", "1"), order("N2", "2")]);

        assert!(cache.get("OLD").is_none());
        assert_eq!(cache.keys(), vec!["N1".to_string(), "N2".to_string()]);
    }

    #[test]
    fn test_load_duplicate_key_takes_last_position() {
        let cache = FifoCache::with_capacity(3);
        cache.load(vec![order("A", "a1"), order("B", "b"), order("A", "a2")]);

        assert_eq!(cache.size(), 2);
        assert_eq!(cache.keys(), vec!["B".to_string(), "A".to_string()]);
        assert_eq!(cache.get("A").map(|o| o.track_number), Some("a2".to_string()));
    }

    #[test]
    fn test_load_keeps_latest_duplicate_when_truncating() {
        let cache = FifoCache::with_capacity(2);
        cache.load(vec![
            order("A", "a1"),
            order("B", "b"),
            order("C", "c"),
            order("A", "a2"),
        ]);

        assert_eq!(cache.keys(), vec!["C".to_string(), "A".to_string()]);
        assert_eq!(cache.get("A").map(|o| o.track_number), Some("a2".to_string()));
        assert!(cache.get("B").is_none());
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_load_empty_clears() {
        let cache = FifoCache::with_capacity(2);
        cache.set(order("A", "a"));
        cache.load(Vec::new());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_stats_track_hits_and_misses() {
        let cache = FifoCache::with_capacity(2);
        cache.set(order("A", "a"));
        let _ = cache.get("A");
        let _ = cache.get("A");
        let _ = cache.get("Z");

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        let cache = Arc::new(FifoCache::with_capacity(16));
        std::thread::scope(|scope| {
            let writer = Arc::clone(&cache);
            scope.spawn(move || {
                for i in 0..500 {
                    writer.set(order(&format!("K{}", i), "v"));
                }
            });
            for _ in 0..4 {
                let reader = Arc::clone(&cache);
                scope.spawn(move || {
                    for i in 0..500 {
                        let _ = reader.get(&format!("K{}", i));
                        assert!(reader.size() <= 16);
                    }
                });
            }
        });

        assert_eq!(cache.size(), 16);
        let keys = cache.keys();
        let expected: Vec<String> = (484..500).map(|i| format!("K{}", i)).collect();
        assert_eq!(keys, expected);
    }

    proptest! {
        #[test]
        fn prop_size_never_exceeds_capacity(
            capacity in 1usize..16,
            keys in prop::collection::vec("[a-e]{1,2}", 0..64),
        ) {
            let cache = FifoCache::with_capacity(capacity);
            for key in &keys {
                cache.set(order(key, "v"));
                prop_assert!(cache.size() <= capacity);
            }
        }

        #[test]
        fn prop_matches_queue_model(
            capacity in 1usize..8,
            keys in prop::collection::vec("[a-j]", 0..64),
        ) {
            let cache = FifoCache::with_capacity(capacity);
            let mut model: VecDeque<String> = VecDeque::new();
            for key in &keys {
                cache.set(order(key, "v"));
                if !model.contains(key) {
                    model.push_back(key.clone());
                    if model.len() > capacity {
                        model.pop_front();
                    }
                }
            }
            prop_assert_eq!(cache.keys(), model.into_iter().collect::<Vec<_>>());
        }

        #[test]
        fn prop_load_with_duplicates_matches_model(
            capacity in 1usize..6,
            keys in prop::collection::vec("[a-h]", 0..32),
        ) {
            let cache = FifoCache::with_capacity(capacity);
            cache.load(keys.iter().map(|k| order(k, "v")).collect());

            let mut model: Vec<String> = Vec::new();
            for key in keys.iter().rev() {
                if model.len() == capacity {
                    break;
                }
                if !model.contains(key) {
                    model.push(key.clone());
                }
            }
            model.reverse();
            prop_assert_eq!(cache.keys(), model);
        }

        #[test]
        fn prop_load_keeps_tail(
            capacity in 1usize..8,
            count in 0usize..20,
        ) {
            let cache = FifoCache::with_capacity(capacity);
            let orders: Vec<Order> = (0..count).map(|i| order(&format!("R{}", i), "v")).collect();
            cache.load(orders);
            let expected: Vec<String> = (count.saturating_sub(capacity)..count)
                .map(|i| format!("R{}", i))
                .collect();
            prop_assert_eq!(cache.keys(), expected);
        }
    }
}
