//! Postgres store against a live database.
//!
//! Run with `--features db-tests` and `ORDERFLOW_DB_*` pointing at a scratch
//! database; the schema is (re)created by the tests.
#![cfg(feature = "db-tests")]

use orderflow_api::migrations::{self, Direction};
use orderflow_api::{DbConfig, PgOrderStore};
use orderflow_core::OrderflowResult;
use orderflow_storage::{FifoCache, OrderCache, OrderStore, WarmStart};
use orderflow_test_utils::fixtures::{order_created_at, valid_order};
use tokio::sync::OnceCell;

static SCHEMA: OnceCell<()> = OnceCell::const_new();

async fn test_store() -> OrderflowResult<PgOrderStore> {
    let store = PgOrderStore::from_config(&DbConfig::from_env())
        .map_err(|e| orderflow_core::StorageError::Unavailable { reason: e.message })?;
    SCHEMA
        .get_or_try_init(|| async {
            migrations::run(store.pool(), Direction::Up).await.map(|_| ())
        })
        .await?;
    Ok(store)
}

fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}-{}", prefix, nanos)
}

#[tokio::test]
async fn test_round_trip_preserves_every_section() -> OrderflowResult<()> {
    let store = test_store().await?;
    let order = valid_order(&unique("pg-roundtrip"));

    store.upsert(&order).await?;

    assert_eq!(store.fetch(&order.order_uid).await?, Some(order));
    Ok(())
}

#[tokio::test]
async fn test_missing_order_is_none() -> OrderflowResult<()> {
    let store = test_store().await?;
    assert_eq!(store.fetch(&unique("pg-missing")).await?, None);
    Ok(())
}

#[tokio::test]
async fn test_upsert_replaces_items_in_order() -> OrderflowResult<()> {
    let store = test_store().await?;
    let mut order = valid_order(&unique("pg-items"));
    let template = order.items[0].clone();
    order.items = (1..=3)
        .map(|i| {
            let mut item = template.clone();
            item.chrt_id = i;
            item
        })
        .collect();
    store.upsert(&order).await?;

    order.items.truncate(1);
    order.items[0].name = "Replacement".to_string();
    order.payment.amount = 999;
    store.upsert(&order).await?;

    let stored = store.fetch(&order.order_uid).await?.unwrap_or_default();
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.items[0].name, "Replacement");
    assert_eq!(stored.payment.amount, 999);
    Ok(())
}

#[tokio::test]
async fn test_recent_keys_newest_first() -> OrderflowResult<()> {
    let store = test_store().await?;
    // Future dates past anything earlier runs wrote, so these two are the newest.
    let base = 3_000_000_000
        + std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
    let older = order_created_at(&unique("pg-recent-a"), base);
    let newer = order_created_at(&unique("pg-recent-b"), base + 1);
    store.upsert(&older).await?;
    store.upsert(&newer).await?;

    let keys = store.recent_keys(2).await?;
    assert_eq!(keys, vec![newer.order_uid.clone(), older.order_uid.clone()]);
    Ok(())
}

#[tokio::test]
async fn test_ping_and_warm_start() -> OrderflowResult<()> {
    let store = test_store().await?;
    store.ping().await?;
    store.upsert(&valid_order(&unique("pg-warm"))).await?;

    let cache = FifoCache::with_capacity(4);
    let report = WarmStart::default().run(&store, &cache).await?;

    assert!(report.loaded > 0);
    assert!(cache.size() <= 4);
    Ok(())
}
