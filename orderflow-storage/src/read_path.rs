//! Lookup by key: cache first, then the durable store.
//!
//! A store hit is returned but not written back into the cache. The cache is
//! fed by the ingestion pipeline and warm start only.

use crate::traits::{OrderCache, OrderStore};
use orderflow_core::{Order, OrderflowResult};
use std::sync::Arc;

/// Where a lookup was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    Cache,
    Store,
}

impl LookupSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupSource::Cache => "cache",
            LookupSource::Store => "store",
        }
    }
}

/// A found order and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub order: Order,
    pub source: LookupSource,
}

/// Read path over a cache and a store.
pub struct OrderReader<C: ?Sized, S: ?Sized> {
    cache: Arc<C>,
    store: Arc<S>,
}

impl<C: ?Sized, S: ?Sized> Clone for OrderReader<C, S> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            store: Arc::clone(&self.store),
        }
    }
}

impl<C, S> OrderReader<C, S>
where
    C: OrderCache + ?Sized,
    S: OrderStore + ?Sized,
{
    pub fn new(cache: Arc<C>, store: Arc<S>) -> Self {
        Self { cache, store }
    }

    /// Find an order by key. `Ok(None)` means neither layer has it.
    pub async fn lookup(&self, order_uid: &str) -> OrderflowResult<Option<Lookup>> {
        if let Some(order) = self.cache.get(order_uid) {
            return Ok(Some(Lookup {
                order,
                source: LookupSource::Cache,
            }));
        }

        let found = self.store.fetch(order_uid).await?;
        Ok(found.map(|order| Lookup {
            order,
            source: LookupSource::Store,
        }))
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}
