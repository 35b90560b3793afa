//! orderflow Telemetry - Observability Infrastructure
//!
//! Structured logging through `tracing` and Prometheus metrics for the HTTP
//! layer and the ingestion pipeline.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, OrderflowMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracer, LogFormat, TelemetryConfig};
