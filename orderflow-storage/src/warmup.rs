//! Warm start: load the most recent orders into the cache before serving.

use crate::traits::{OrderCache, OrderStore};
use orderflow_core::{demo_order, OrderflowResult, ServiceConfig, DEFAULT_WARMUP_LIMIT};

/// Warm start settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmStart {
    /// Maximum number of orders to load.
    pub limit: usize,
    /// Seed the demonstration order when the store is empty.
    pub seed_demo: bool,
}

impl Default for WarmStart {
    fn default() -> Self {
        Self {
            limit: DEFAULT_WARMUP_LIMIT,
            seed_demo: true,
        }
    }
}

/// What a warm start did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmupReport {
    /// Orders placed in the cache.
    pub loaded: usize,
    /// Keys listed by the store but gone by the time they were fetched.
    pub skipped: usize,
    /// Whether the demonstration order was written.
    pub seeded: bool,
}

impl WarmStart {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            limit: config.warmup_limit,
            seed_demo: config.seed_demo_order,
        }
    }

    /// Fill `cache` from `store`. Any store error is returned as is.
    pub async fn run<S, C>(&self, store: &S, cache: &C) -> OrderflowResult<WarmupReport>
    where
        S: OrderStore + ?Sized,
        C: OrderCache + ?Sized,
    {
        if self.limit == 0 {
            tracing::warn!("warm start limit is zero, cache starts empty");
        }
        let mut keys = store.recent_keys(self.limit).await?;
        let mut report = WarmupReport::default();

        if keys.is_empty() && self.seed_demo && self.limit > 0 {
            let demo = demo_order();
            store.upsert(&demo).await?;
            tracing::info!(order_uid = %demo.order_uid, "store empty, seeded demonstration order");
            keys.push(demo.order_uid);
            report.seeded = true;
        }

        // Newest first from the store, the cache wants oldest first.
        keys.reverse();

        let mut orders = Vec::with_capacity(keys.len());
        for key in &keys {
            match store.fetch(key).await? {
                Some(order) => orders.push(order),
                None => {
                    tracing::warn!(order_uid = %key, "order vanished during warm start");
                    report.skipped += 1;
                }
            }
        }

        report.loaded = orders.len();
        cache.load(orders);
        tracing::info!(
            loaded = report.loaded,
            skipped = report.skipped,
            seeded = report.seeded,
            "cache warm start complete"
        );
        Ok(report)
    }
}
