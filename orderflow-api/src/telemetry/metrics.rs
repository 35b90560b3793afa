//! Prometheus Metrics Definitions
//!
//! Registered once in the default registry and exposed on `/metrics`.
//! Ingestion and cache gauges are refreshed from their atomics on each scrape.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use orderflow_ingest::PipelineSnapshot;
use orderflow_storage::{CacheStats, OrderCache};
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge_vec, CounterVec, Encoder,
    HistogramVec, IntGaugeVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0,
];

/// Global metrics instance - initialized on first use
pub static METRICS: Lazy<ApiResult<OrderflowMetrics>> = Lazy::new(OrderflowMetrics::new);

fn registration_failed(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

/// Container for all orderflow metrics.
#[derive(Clone)]
pub struct OrderflowMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Order lookups - labels: source (cache, store, miss, error)
    pub order_lookups_total: CounterVec,

    /// Pipeline counters mirrored as gauges - labels: counter
    pub ingest_messages: IntGaugeVec,

    /// Cache counters mirrored as gauges - labels: stat
    pub cache: IntGaugeVec,
}

impl OrderflowMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "orderflow_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_failed("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "orderflow_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_failed("http_request_duration_seconds", e))?,

            order_lookups_total: register_counter_vec!(
                "orderflow_order_lookups_total",
                "Order lookups by where they were answered",
                &["source"]
            )
            .map_err(|e| registration_failed("order_lookups_total", e))?,

            ingest_messages: register_int_gauge_vec!(
                "orderflow_ingest_messages",
                "Ingestion pipeline counters since start",
                &["counter"]
            )
            .map_err(|e| registration_failed("ingest_messages", e))?,

            cache: register_int_gauge_vec!(
                "orderflow_cache",
                "Order cache counters since start",
                &["stat"]
            )
            .map_err(|e| registration_failed("cache", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record where an order lookup was answered.
    pub fn record_lookup(&self, source: &str) {
        self.order_lookups_total.with_label_values(&[source]).inc();
    }

    pub fn set_pipeline(&self, snapshot: &PipelineSnapshot) {
        for (counter, value) in snapshot.labelled() {
            self.ingest_messages
                .with_label_values(&[counter])
                .set(i64::try_from(value).unwrap_or(i64::MAX));
        }
    }

    pub fn set_cache(&self, stats: &CacheStats) {
        for (stat, value) in [
            ("entries", stats.entry_count),
            ("hits", stats.hits),
            ("misses", stats.misses),
            ("evictions", stats.evictions),
        ] {
            self.cache
                .with_label_values(&[stat])
                .set(i64::try_from(value).unwrap_or(i64::MAX));
        }
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.set_cache(&state.cache().stats());
        if let Some(pipeline) = &state.pipeline {
            metrics.set_pipeline(&pipeline.snapshot());
        }
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    fn metrics() -> Result<&'static OrderflowMetrics, String> {
        METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))
    }

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        let metrics = metrics()?;
        assert!(!metrics.http_requests_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_lookup() -> Result<(), String> {
        let metrics = metrics()?;
        let before = metrics.order_lookups_total.with_label_values(&["store"]).get();
        metrics.record_lookup("store");
        let after = metrics.order_lookups_total.with_label_values(&["store"]).get();
        assert!(after >= before + 1.0);
        Ok(())
    }

    #[test]
    fn test_pipeline_gauges_mirror_snapshot() -> Result<(), String> {
        let metrics = metrics()?;
        let snapshot = PipelineSnapshot {
            received: 7,
            stored: 5,
            malformed: 1,
            invalid: 1,
            ..Default::default()
        };
        metrics.set_pipeline(&snapshot);
        assert_eq!(metrics.ingest_messages.with_label_values(&["received"]).get(), 7);
        assert_eq!(metrics.ingest_messages.with_label_values(&["stored"]).get(), 5);
        Ok(())
    }

    #[test]
    fn test_cache_gauges() -> Result<(), String> {
        let metrics = metrics()?;
        metrics.set_cache(&CacheStats {
            hits: 3,
            misses: 2,
            entry_count: 1,
            evictions: 0,
        });
        assert_eq!(metrics.cache.with_label_values(&["hits"]).get(), 3);
        assert_eq!(metrics.cache.with_label_values(&["entries"]).get(), 1);
        Ok(())
    }
}
