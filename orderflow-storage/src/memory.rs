//! In-memory order store.

use crate::traits::OrderStore;
use async_trait::async_trait;
use orderflow_core::{Order, OrderflowResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Rows {
    orders: HashMap<String, (u64, Order)>,
    next_seq: u64,
}

/// Process-local [`OrderStore`] for tests and local runs.
///
/// Upserts replace the whole order under one write lock, which gives the
/// same all-or-nothing visibility as a database transaction. An update keeps
/// the original insertion sequence, which only breaks `date_created` ties.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    rows: Arc<RwLock<Rows>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `orders`, in the given order.
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let store = Self::new();
        {
            let mut rows = store.rows.write();
            for order in orders {
                Self::put(&mut rows, order);
            }
        }
        store
    }

    /// Number of stored orders.
    pub fn len(&self) -> usize {
        self.rows.read().orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every order.
    pub fn clear(&self) {
        let mut rows = self.rows.write();
        rows.orders.clear();
    }

    fn put(rows: &mut Rows, order: Order) {
        let seq = match rows.orders.get(&order.order_uid) {
            Some((seq, _)) => *seq,
            None => {
                rows.next_seq += 1;
                rows.next_seq
            }
        };
        rows.orders.insert(order.order_uid.clone(), (seq, order));
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn upsert(&self, order: &Order) -> OrderflowResult<()> {
        let mut rows = self.rows.write();
        Self::put(&mut rows, order.clone());
        Ok(())
    }

    async fn fetch(&self, order_uid: &str) -> OrderflowResult<Option<Order>> {
        Ok(self
            .rows
            .read()
            .orders
            .get(order_uid)
            .map(|(_, order)| order.clone()))
    }

    async fn recent_keys(&self, limit: usize) -> OrderflowResult<Vec<String>> {
        let rows = self.rows.read();
        let mut entries: Vec<(&u64, &Order)> =
            rows.orders.values().map(|(seq, order)| (seq, order)).collect();
        entries.sort_by(|(seq_a, a), (seq_b, b)| {
            b.date_created
                .cmp(&a.date_created)
                .then_with(|| seq_b.cmp(seq_a))
        });
        Ok(entries
            .into_iter()
            .take(limit)
            .map(|(_, order)| order.order_uid.clone())
            .collect())
    }
}
