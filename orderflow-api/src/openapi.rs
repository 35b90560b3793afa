//! OpenAPI Specification for the orderflow HTTP API
//!
//! Generated with utoipa from the route annotations and model types.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::routes::{health, order};
use crate::telemetry::metrics;
use orderflow_core::{Delivery, Item, Order, Payment};

/// OpenAPI document for the orderflow API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "orderflow API",
        version = "0.1.0",
        description = "Read access to orders ingested from the order stream",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8081", description = "Local Development")
    ),
    tags(
        (name = "Orders", description = "Order lookup by key"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        order::get_order,
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(schemas(
        Order,
        Delivery,
        Payment,
        Item,
        ApiError,
        ErrorCode,
        HealthResponse,
        HealthStatus,
        HealthDetails,
        ComponentHealth,
    ))
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI specification as pretty-printed JSON.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
