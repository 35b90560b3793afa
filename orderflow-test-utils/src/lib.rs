//! orderflow Test Utilities
//!
//! Centralized test infrastructure for the orderflow workspace:
//! - Proptest generators for orders
//! - Recording and failing collaborators for the cache and the store
//! - Test fixtures for common scenarios
//! - Custom assertions for orderflow results

// Re-export core types for convenience
pub use orderflow_core::{
    Delivery, Item, Order, OrderValidator, OrderflowError, OrderflowResult, Payment,
    StorageError, Timestamp, ValidationError, Validator,
};
pub use orderflow_storage::{FifoCache, InMemoryOrderStore, OrderCache, OrderStore};

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

// ============================================================================
// RECORDING COLLABORATORS
// ============================================================================

/// Store double that records every call and can be told to fail.
///
/// Backed by an [`InMemoryOrderStore`], so successful writes are readable.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: InMemoryOrderStore,
    upserts: Mutex<Vec<Order>>,
    fetches: Mutex<Vec<String>>,
    recent_calls: AtomicUsize,
    fail_upsert: AtomicBool,
    fail_fetch: AtomicBool,
    fail_recent: AtomicBool,
    fail_ping: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `orders`. Seeding is not recorded.
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        Self {
            inner: InMemoryOrderStore::with_orders(orders),
            ..Self::default()
        }
    }

    /// Make every `upsert` fail with a write error.
    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upsert.store(fail, Ordering::SeqCst);
    }

    /// Make every `fetch` fail with a read error.
    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Make `recent_keys` fail.
    pub fn fail_recent_keys(&self, fail: bool) {
        self.fail_recent.store(fail, Ordering::SeqCst);
    }

    /// Make `ping` fail.
    pub fn fail_ping(&self, fail: bool) {
        self.fail_ping.store(fail, Ordering::SeqCst);
    }

    /// Orders passed to `upsert`, in call order, including failed calls.
    pub fn upserts(&self) -> Vec<Order> {
        self.upserts.lock().clone()
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.lock().len()
    }

    /// Keys passed to `fetch`, in call order.
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().len()
    }

    pub fn recent_keys_calls(&self) -> usize {
        self.recent_calls.load(Ordering::SeqCst)
    }

    /// Number of orders actually stored.
    pub fn stored_count(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl OrderStore for RecordingStore {
    async fn upsert(&self, order: &Order) -> OrderflowResult<()> {
        self.upserts.lock().push(order.clone());
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed {
                order_uid: order.order_uid.clone(),
                reason: "injected write failure".to_string(),
            }
            .into());
        }
        self.inner.upsert(order).await
    }

    async fn fetch(&self, order_uid: &str) -> OrderflowResult<Option<Order>> {
        self.fetches.lock().push(order_uid.to_string());
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StorageError::ReadFailed {
                order_uid: order_uid.to_string(),
                reason: "injected read failure".to_string(),
            }
            .into());
        }
        self.inner.fetch(order_uid).await
    }

    async fn recent_keys(&self, limit: usize) -> OrderflowResult<Vec<String>> {
        self.recent_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_recent.load(Ordering::SeqCst) {
            return Err(StorageError::QueryFailed {
                reason: "injected query failure".to_string(),
            }
            .into());
        }
        self.inner.recent_keys(limit).await
    }

    async fn ping(&self) -> OrderflowResult<()> {
        if self.fail_ping.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                reason: "injected outage".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Cache double that records mutations and reads over a real [`FifoCache`].
#[derive(Debug, Default)]
pub struct RecordingCache {
    inner: FifoCache,
    sets: Mutex<Vec<Order>>,
    loads: Mutex<Vec<Vec<String>>>,
    gets: AtomicUsize,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            inner: FifoCache::with_capacity(max_entries),
            ..Self::default()
        }
    }

    /// Orders passed to `set`, in call order.
    pub fn sets(&self) -> Vec<Order> {
        self.sets.lock().clone()
    }

    pub fn set_count(&self) -> usize {
        self.sets.lock().len()
    }

    /// Keys of each `load` call, in the order they were given.
    pub fn loads(&self) -> Vec<Vec<String>> {
        self.loads.lock().clone()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

impl OrderCache for RecordingCache {
    fn get(&self, key: &str) -> Option<Order> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key)
    }

    fn set(&self, order: Order) {
        self.sets.lock().push(order.clone());
        self.inner.set(order);
    }

    fn load(&self, orders: Vec<Order>) {
        self.loads
            .lock()
            .push(orders.iter().map(|o| o.order_uid.clone()).collect());
        self.inner.load(orders);
    }

    fn size(&self) -> usize {
        self.inner.size()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating orders.

    use super::*;
    use proptest::prelude::*;

    /// Generate an order key that passes validation.
    pub fn arb_order_uid() -> impl Strategy<Value = String> {
        "[a-z0-9]{8,32}"
    }

    /// Generate a Timestamp (DateTime<Utc>) between 2020 and 2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_default()
        })
    }

    /// Generate a valid delivery section.
    pub fn arb_delivery() -> impl Strategy<Value = Delivery> {
        (
            "[A-Z][a-z]{1,15} [A-Z][a-z]{1,15}",
            "\\+[1-9][0-9]{6,13}",
            "[0-9]{3,10}",
            "[A-Z][a-z]{0,20}",
            "[A-Z][a-z]{1,20} [0-9]{1,3}",
            "[A-Z][a-z]{0,20}",
            "[a-z]{1,10}@[a-z]{1,10}\\.(com|org|net)",
        )
            .prop_map(|(name, phone, zip, city, address, region, email)| Delivery {
                name,
                phone,
                zip,
                city,
                address,
                region,
                email,
            })
    }

    /// Generate a valid payment section for `transaction`.
    pub fn arb_payment(transaction: String) -> impl Strategy<Value = Payment> {
        (
            "(USD|EUR|RUB)",
            "[a-z]{1,10}",
            0i32..100_000,
            1i64..2_000_000_000,
            "[a-z]{1,10}",
            0i32..5_000,
            0i32..100_000,
            0i32..1_000,
        )
            .prop_map(
                move |(
                    currency,
                    provider,
                    amount,
                    payment_dt,
                    bank,
                    delivery_cost,
                    goods_total,
                    custom_fee,
                )| Payment {
                    transaction: transaction.clone(),
                    request_id: String::new(),
                    currency,
                    provider,
                    amount,
                    payment_dt,
                    bank,
                    delivery_cost,
                    goods_total,
                    custom_fee,
                },
            )
    }

    /// Generate a valid line item.
    pub fn arb_item() -> impl Strategy<Value = Item> {
        (
            1i64..100_000_000,
            "[A-Z]{5,16}",
            0i32..100_000,
            "[a-z0-9]{4,32}",
            "[A-Z][a-z]{0,30}",
            0i32..=100,
            "[0-9]{1,3}",
            0i32..100_000,
            1i64..100_000_000,
            "[A-Z][a-z]{0,20}",
            0i32..1000,
        )
            .prop_map(
                |(
                    chrt_id,
                    track_number,
                    price,
                    rid,
                    name,
                    sale,
                    size,
                    total_price,
                    nm_id,
                    brand,
                    status,
                )| Item {
                    chrt_id,
                    track_number,
                    price,
                    rid,
                    name,
                    sale,
                    size,
                    total_price,
                    nm_id,
                    brand,
                    status,
                },
            )
    }

    /// Generate an order that passes [`OrderValidator`].
    pub fn arb_valid_order() -> impl Strategy<Value = Order> {
        arb_order_uid().prop_flat_map(|uid| {
            let header = (
                "[A-Z]{5,16}",
                "[A-Z]{2,8}",
                "(en|ru|de|fr)",
                "[a-z0-9]{1,16}",
                "[a-z]{1,16}",
                "[0-9]{1,2}",
                0i32..1000,
                arb_timestamp(),
                "[0-9]{1,2}",
            );
            let body = (
                arb_delivery(),
                arb_payment(uid.clone()),
                prop::collection::vec(arb_item(), 1..5),
            );
            (Just(uid), header, body).prop_map(
                |(
                    order_uid,
                    (
                        track_number,
                        entry,
                        locale,
                        customer_id,
                        delivery_service,
                        shardkey,
                        sm_id,
                        date_created,
                        oof_shard,
                    ),
                    (delivery, payment, items),
                )| Order {
                    order_uid,
                    track_number,
                    entry,
                    delivery,
                    payment,
                    items,
                    locale,
                    internal_signature: String::new(),
                    customer_id,
                    delivery_service,
                    shardkey,
                    sm_id,
                    date_created,
                    oof_shard,
                },
            )
        })
    }

    /// Number of distinct breakages applied by [`arb_invalid_order`].
    pub const BREAKAGES: usize = 8;

    /// Generate a decodable order that violates exactly one rule.
    pub fn arb_invalid_order() -> impl Strategy<Value = Order> {
        (arb_valid_order(), 0usize..BREAKAGES).prop_map(|(mut order, breakage)| {
            match breakage {
                0 => order.order_uid.clear(),
                1 => order.items.clear(),
                2 => order.delivery.email = "not-an-email".to_string(),
                3 => order.payment.currency = "US".to_string(),
                4 => order.items[0].sale = 101,
                5 => order.payment.amount = -1,
                6 => order.delivery.phone = "12345".to_string(),
                _ => order.date_created = Timestamp::default(),
            }
            order
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// A valid order with the given key, based on the demonstration order.
    pub fn valid_order(order_uid: &str) -> Order {
        let mut order = orderflow_core::demo_order();
        order.order_uid = order_uid.to_string();
        order.payment.transaction = order_uid.to_string();
        order
    }

    /// A valid order created at `secs` past the Unix epoch.
    pub fn order_created_at(order_uid: &str, secs: i64) -> Order {
        let mut order = valid_order(order_uid);
        order.date_created = chrono::DateTime::from_timestamp(secs, 0).unwrap_or_default();
        order
    }

    /// A decodable order with an empty key.
    pub fn order_with_empty_key() -> Order {
        valid_order("")
    }

    /// Wire bytes for an order.
    pub fn payload(order: &Order) -> Vec<u8> {
        serde_json::to_vec(order).unwrap_or_default()
    }

    /// Wire bytes for an order, prefixed with a UTF-8 byte-order mark.
    pub fn payload_with_bom(order: &Order) -> Vec<u8> {
        let mut bytes = orderflow_core::UTF8_BOM.to_vec();
        bytes.extend(payload(order));
        bytes
    }

    /// Bytes that do not decode.
    pub fn malformed_payload() -> Vec<u8> {
        b"{\"order_uid\": \"truncated".to_vec()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for orderflow results.

    use super::*;

    /// Assert that an OrderflowResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &OrderflowResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that an OrderflowResult is a Storage error.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &OrderflowResult<T>) {
        match result {
            Err(OrderflowError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    /// Assert that a validation result names `field`.
    #[track_caller]
    pub fn assert_invalid_field(result: &Result<(), ValidationError>, field: &str) {
        match result {
            Err(err) => assert_eq!(err.field(), field, "Wrong field in {:?}", err),
            Ok(()) => panic!("Expected validation failure on {}, got Ok", field),
        }
    }

    /// Assert that `cache` holds exactly `keys`.
    #[track_caller]
    pub fn assert_cached<C: OrderCache + ?Sized>(cache: &C, keys: &[&str]) {
        assert_eq!(cache.size(), keys.len(), "Unexpected cache size");
        for key in keys {
            assert!(cache.get(key).is_some(), "Expected {} in cache", key);
        }
    }
}
