//! Capability contracts for the cache and the durable store.
//!
//! Every concrete adapter (in-memory, Postgres, test doubles) implements the
//! same trait, so collaborators are chosen at construction time.

use async_trait::async_trait;
use orderflow_core::{Order, OrderflowResult};
use std::sync::Arc;

/// Process-local key to order cache.
///
/// All operations are total: there is no error path. Implementations must
/// let concurrent readers proceed in parallel while any mutation excludes
/// every other access.
pub trait OrderCache: Send + Sync {
    /// Current value for `key`, if present. Never blocks on I/O.
    fn get(&self, key: &str) -> Option<Order>;

    /// Insert or replace by `order.order_uid`.
    fn set(&self, order: Order);

    /// Replace the entire contents. Input order defines recency, the last
    /// element being the most recent.
    fn load(&self, orders: Vec<Order>);

    /// Number of live entries.
    fn size(&self) -> usize;

    /// Usage counters.
    fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.size() as u64,
            ..CacheStats::default()
        }
    }
}

/// Durable read/write of orders.
///
/// `upsert` must be atomic from the caller's point of view: either the whole
/// order (top-level fields, both sections and the full item list) is visible
/// on the next read, or none of it is. Items are replaced, never merged.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert or fully replace an order by key.
    async fn upsert(&self, order: &Order) -> OrderflowResult<()>;

    /// Fetch an order by key. `Ok(None)` when it does not exist.
    async fn fetch(&self, order_uid: &str) -> OrderflowResult<Option<Order>>;

    /// Keys of the most recent orders by `date_created`, newest first.
    async fn recent_keys(&self, limit: usize) -> OrderflowResult<Vec<String>>;

    /// Cheap reachability check.
    async fn ping(&self) -> OrderflowResult<()> {
        Ok(())
    }
}

impl<C: OrderCache + ?Sized> OrderCache for Arc<C> {
    fn get(&self, key: &str) -> Option<Order> {
        (**self).get(key)
    }

    fn set(&self, order: Order) {
        (**self).set(order)
    }

    fn load(&self, orders: Vec<Order>) {
        (**self).load(orders)
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn stats(&self) -> CacheStats {
        (**self).stats()
    }
}

#[async_trait]
impl<S: OrderStore + ?Sized> OrderStore for Arc<S> {
    async fn upsert(&self, order: &Order) -> OrderflowResult<()> {
        (**self).upsert(order).await
    }

    async fn fetch(&self, order_uid: &str) -> OrderflowResult<Option<Order>> {
        (**self).fetch(order_uid).await
    }

    async fn recent_keys(&self, limit: usize) -> OrderflowResult<Vec<String>> {
        (**self).recent_keys(limit).await
    }

    async fn ping(&self) -> OrderflowResult<()> {
        (**self).ping().await
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Number of evictions due to capacity.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
