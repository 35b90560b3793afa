//! In-process HTTP tests for the read API.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use orderflow_api::routes::order::ORDER_SOURCE_HEADER;
use orderflow_api::{create_api_router, ApiError, AppState, ErrorCode, ServerConfig};
use orderflow_ingest::PipelineMetrics;
use orderflow_test_utils::fixtures::valid_order;
use orderflow_test_utils::{FifoCache, Order, OrderCache, RecordingStore};
use std::sync::Arc;
use tower::ServiceExt;

struct Harness {
    app: Router,
    cache: Arc<FifoCache>,
    store: Arc<RecordingStore>,
}

fn harness(store: RecordingStore) -> Harness {
    let cache = Arc::new(FifoCache::with_capacity(8));
    let store = Arc::new(store);
    let state = AppState::new(cache.clone(), store.clone())
        .with_pipeline_metrics(Arc::new(PipelineMetrics::new()));
    Harness {
        app: create_api_router(state, &ServerConfig::default()),
        cache,
        store,
    }
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap_or_default();
    let response = match app.clone().oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let status = response.status();
    let source = response
        .headers()
        .get(ORDER_SOURCE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .map(|b| b.to_vec())
        .unwrap_or_default();
    (status, source, body)
}

fn error_code(body: &[u8]) -> Option<ErrorCode> {
    serde_json::from_slice::<ApiError>(body).ok().map(|e| e.code)
}

#[tokio::test]
async fn test_cache_hit_served_without_store() -> Result<(), serde_json::Error> {
    let h = harness(RecordingStore::new());
    let order = valid_order("order-0001");
    h.cache.set(order.clone());

    let (status, source, body) = get(&h.app, "/order/order-0001").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(source.as_deref(), Some("cache"));
    assert_eq!(serde_json::from_slice::<Order>(&body)?, order);
    assert_eq!(h.store.fetch_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_store_fallback_does_not_populate_cache() -> Result<(), serde_json::Error> {
    let order = valid_order("order-0002");
    let h = harness(RecordingStore::with_orders([order.clone()]));

    let (status, source, body) = get(&h.app, "/order/order-0002").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(source.as_deref(), Some("store"));
    assert_eq!(serde_json::from_slice::<Order>(&body)?, order);
    assert_eq!(h.store.fetches(), vec!["order-0002".to_string()]);
    assert!(h.cache.get("order-0002").is_none());
    Ok(())
}

#[tokio::test]
async fn test_unknown_order_is_404() {
    let h = harness(RecordingStore::new());

    let (status, _, body) = get(&h.app, "/order/does-not-exist").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), Some(ErrorCode::OrderNotFound));
}

#[tokio::test]
async fn test_blank_id_is_400() {
    let h = harness(RecordingStore::new());

    let (status, _, body) = get(&h.app, "/order/%20%20").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), Some(ErrorCode::InvalidInput));
    assert_eq!(h.store.fetch_count(), 0);
}

#[tokio::test]
async fn test_store_failure_is_500_and_not_a_miss() {
    let h = harness(RecordingStore::new());
    h.store.fail_fetches(true);

    let (status, _, body) = get(&h.app, "/order/order-0003").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(&body), Some(ErrorCode::DatabaseError));
}

#[tokio::test]
async fn test_health_probes() {
    let h = harness(RecordingStore::new());

    let (status, _, body) = get(&h.app, "/health/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"pong");

    let (status, _, _) = get(&h.app, "/health/live").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = get(&h.app, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["details"]["store"]["status"], "healthy");
}

#[tokio::test]
async fn test_readiness_fails_when_store_unreachable() {
    let h = harness(RecordingStore::new());
    h.store.fail_ping(true);

    let (status, _, body) = get(&h.app, "/health/ready").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();
    assert_eq!(json["status"], "unhealthy");
    assert!(json["details"]["store"]["error"].is_string());
}

#[tokio::test]
async fn test_metrics_exposes_cache_and_pipeline_gauges() {
    let h = harness(RecordingStore::new());
    h.cache.set(valid_order("order-0004"));
    let _ = get(&h.app, "/order/order-0004").await;

    let (status, _, body) = get(&h.app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("orderflow_cache"));
    assert!(text.contains("orderflow_ingest_messages"));
    assert!(text.contains("orderflow_order_lookups_total"));
}

#[tokio::test]
async fn test_openapi_document_served() {
    let h = harness(RecordingStore::new());

    let (status, _, body) = get(&h.app, "/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();
    assert!(json["paths"]["/order/{id}"].is_object());
}
