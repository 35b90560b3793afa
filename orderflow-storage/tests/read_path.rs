//! Read path: cache first, store second, no write-back.

use orderflow_core::OrderflowResult;
use orderflow_storage::{LookupSource, OrderCache, OrderReader};
use orderflow_test_utils::assertions::assert_storage_error;
use orderflow_test_utils::fixtures::valid_order;
use orderflow_test_utils::{RecordingCache, RecordingStore};
use std::sync::Arc;

fn reader(store: RecordingStore) -> OrderReader<RecordingCache, RecordingStore> {
    OrderReader::new(Arc::new(RecordingCache::with_capacity(8)), Arc::new(store))
}

#[tokio::test]
async fn test_cache_hit_never_calls_store() -> OrderflowResult<()> {
    let reader = reader(RecordingStore::new());
    reader.cache().set(valid_order("order-0001"));

    let found = reader.lookup("order-0001").await?;

    assert_eq!(found.map(|l| l.source), Some(LookupSource::Cache));
    assert_eq!(reader.store().fetch_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_cache_miss_falls_back_to_store() -> OrderflowResult<()> {
    let reader = reader(RecordingStore::with_orders([valid_order("order-0001")]));

    let found = reader.lookup("order-0001").await?;

    let lookup = found.ok_or_else(|| orderflow_core::StorageError::QueryFailed {
        reason: "expected a stored order".to_string(),
    })?;
    assert_eq!(lookup.source, LookupSource::Store);
    assert_eq!(lookup.order, valid_order("order-0001"));
    assert_eq!(reader.store().fetches(), vec!["order-0001".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_miss_everywhere_is_none() -> OrderflowResult<()> {
    let reader = reader(RecordingStore::new());
    assert!(reader.lookup("nobody").await?.is_none());
    Ok(())
}

/// A store hit is not written back into the cache, so repeated misses keep
/// reaching the store until ingestion or warm start puts the key in cache.
#[tokio::test]
async fn test_store_hit_does_not_populate_cache() -> OrderflowResult<()> {
    let reader = reader(RecordingStore::with_orders([valid_order("order-0001")]));

    reader.lookup("order-0001").await?;
    reader.lookup("order-0001").await?;

    assert_eq!(reader.cache().size(), 0);
    assert_eq!(reader.cache().set_count(), 0);
    assert_eq!(reader.store().fetch_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_store_error_propagates() {
    let reader = reader(RecordingStore::new());
    reader.store().fail_fetches(true);

    let result = reader.lookup("order-0001").await;

    assert_storage_error(&result);
}

#[tokio::test]
async fn test_cache_value_wins_over_store() -> OrderflowResult<()> {
    let mut stale = valid_order("order-0001");
    stale.track_number = "STALETRACK".to_string();
    let reader = reader(RecordingStore::with_orders([stale]));
    reader.cache().set(valid_order("order-0001"));

    let found = reader.lookup("order-0001").await?;

    assert_eq!(found.map(|l| l.order.track_number), Some("WBILMTESTTRACK".to_string()));
    Ok(())
}
