//! orderflow API - HTTP read path and service wiring
//!
//! Serves orders by key from the in-memory cache with the Postgres store as
//! fallback, exposes health and Prometheus endpoints, and provides the
//! Postgres store, schema migrations and (with the `kafka` feature) the Kafka
//! message source used by the `orderflow` binary.

pub mod config;
pub mod db;
pub mod error;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod migrations;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::{split_csv, KafkaConfig, ServerConfig};
pub use db::{DbConfig, PgOrderStore};
pub use error::{ApiError, ApiResult, ErrorCode};
#[cfg(feature = "kafka")]
pub use kafka::KafkaSource;
pub use migrations::{Direction, Migration, MIGRATIONS};
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::AppState;
