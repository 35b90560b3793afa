//! Order lookup endpoint.

use axum::{
    extract::{Path, State},
    http::{HeaderName, HeaderValue},
    Json,
};
use orderflow_core::Order;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::telemetry::METRICS;

/// Response header naming the layer that answered: `cache` or `store`.
pub const ORDER_SOURCE_HEADER: HeaderName = HeaderName::from_static("x-order-source");

fn record_lookup(source: &str) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_lookup(source);
    }
}

/// GET /order/{id} - Fetch an order by key, cache first
#[utoipa::path(
    get,
    path = "/order/{id}",
    tag = "Orders",
    params(
        ("id" = String, Path, description = "Order key (order_uid)")
    ),
    responses(
        (status = 200, description = "Order found", body = Order),
        (status = 400, description = "Blank order key", body = ApiError),
        (status = 404, description = "Order not found", body = ApiError),
        (status = 500, description = "Order store failure", body = ApiError),
    ),
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_uid): Path<String>,
) -> ApiResult<([(HeaderName, HeaderValue); 1], Json<Order>)> {
    if order_uid.trim().is_empty() {
        return Err(ApiError::invalid_input("Order id must not be blank"));
    }

    match state.reader.lookup(&order_uid).await {
        Ok(Some(found)) => {
            let source = found.source.as_str();
            record_lookup(source);
            tracing::debug!(order_uid = %order_uid, source, "Order served");
            Ok((
                [(ORDER_SOURCE_HEADER, HeaderValue::from_static(source))],
                Json(found.order),
            ))
        }
        Ok(None) => {
            record_lookup("miss");
            Err(ApiError::order_not_found(&order_uid))
        }
        Err(e) => {
            record_lookup("error");
            tracing::error!(order_uid = %order_uid, error = %e, "Order lookup failed");
            Err(e.into())
        }
    }
}
