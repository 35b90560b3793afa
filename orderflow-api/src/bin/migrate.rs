//! Apply or revert the orderflow schema.
//!
//! Usage: `orderflow-migrate up|down`. Connection settings come from the
//! same `ORDERFLOW_DB_*` variables as the service.

use orderflow_api::migrations::{self, Direction};
use orderflow_api::telemetry::{init_tracer, TelemetryConfig};
use orderflow_api::{ApiError, ApiResult, DbConfig};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracer(&TelemetryConfig::default())?;

    let arg = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    let direction = arg
        .parse::<Direction>()
        .map_err(|e| ApiError::invalid_input(e.to_string()))?;

    let pool = DbConfig::from_env().create_pool()?;
    let applied = migrations::run(&pool, direction).await?;
    tracing::info!(direction = ?direction, count = applied.len(), "migrations finished");
    Ok(())
}
