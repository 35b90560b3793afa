//! orderflow Service Entry Point
//!
//! Connects the Postgres store, warms the cache, starts the Kafka ingestion
//! pipeline and serves the HTTP API until SIGINT or SIGTERM.

use std::sync::Arc;

use orderflow_api::telemetry::{init_tracer, TelemetryConfig};
use orderflow_api::{
    create_api_router, ApiError, ApiResult, AppState, DbConfig, KafkaConfig, KafkaSource,
    PgOrderStore, ServerConfig,
};
use orderflow_core::{OrderValidator, ServiceConfig};
use orderflow_ingest::{run_pipeline, IngestPipeline, RunnerConfig};
use orderflow_storage::{FifoCache, OrderStore, WarmStart};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let service_config = ServiceConfig::from_env()?;
    service_config.validate()?;
    let server_config = ServerConfig::from_env()?;
    let kafka_config = KafkaConfig::from_env();
    kafka_config.validate()?;

    let store = Arc::new(PgOrderStore::from_config(&DbConfig::from_env())?);
    store.ping().await?;
    tracing::info!(pool_size = store.pool_size(), "order store reachable");

    let cache = Arc::new(FifoCache::with_capacity(service_config.cache_max_entries));
    WarmStart::from_config(&service_config)
        .run(&*store, &*cache)
        .await?;

    let mut source = KafkaSource::connect(&kafka_config).await?;
    let pipeline = Arc::new(IngestPipeline::new(
        Arc::clone(&cache),
        Arc::clone(&store),
        OrderValidator::new(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner_config = RunnerConfig::from_config(&service_config);
    let worker = Arc::clone(&pipeline);
    let pipeline_task = tokio::spawn(async move {
        run_pipeline(worker.as_ref(), &mut source, runner_config, shutdown_rx).await
    });

    let state = AppState::new(cache, store).with_pipeline_metrics(pipeline.metrics());
    let app = create_api_router(state, &server_config);

    let addr = server_config.bind_addr()?;
    tracing::info!(%addr, "Starting orderflow HTTP server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(server_config.shutdown_grace, pipeline_task).await {
        Ok(Ok((reason, snapshot))) => {
            tracing::info!(reason = ?reason, ?snapshot, "pipeline stopped");
        }
        Ok(Err(e)) => tracing::error!(error = %e, "pipeline task failed"),
        Err(_) => tracing::warn!(
            grace_secs = server_config.shutdown_grace.as_secs(),
            "pipeline did not stop within the grace period"
        ),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
