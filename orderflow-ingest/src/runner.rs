//! Long-running consumer loop.
//!
//! Checks the shutdown signal between messages, never in the middle of one.
//! A message already taken from the source is always carried to completion.

use crate::metrics::{PipelineMetrics, PipelineSnapshot};
use crate::pipeline::IngestPipeline;
use crate::source::MessageSource;
use orderflow_core::{ServiceConfig, Validator};
use orderflow_storage::{OrderCache, OrderStore};
use std::time::Duration;
use tokio::sync::watch;

/// Configuration for the consumer loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Pause after a failed receive before polling again.
    pub retry_delay: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl RunnerConfig {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            retry_delay: config.source_retry_delay,
        }
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was signalled, or the signal sender was dropped.
    Shutdown,
    /// The source reported the end of the stream.
    SourceClosed,
}

/// Consume `source` through `pipeline` until shutdown or end of stream.
///
/// # Example
///
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let handle = tokio::spawn(async move {
///     run_pipeline(&pipeline, &mut source, RunnerConfig::default(), shutdown_rx).await
/// });
///
/// // Later, trigger shutdown
/// let _ = shutdown_tx.send(true);
/// let (reason, snapshot) = handle.await?;
/// ```
pub async fn run_pipeline<C, S, V, M>(
    pipeline: &IngestPipeline<C, S, V>,
    source: &mut M,
    config: RunnerConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> (StopReason, PipelineSnapshot)
where
    C: OrderCache + ?Sized,
    S: OrderStore + ?Sized,
    V: Validator,
    M: MessageSource + ?Sized,
{
    tracing::info!(
        retry_delay_ms = config.retry_delay.as_millis() as u64,
        "ingestion pipeline started"
    );

    let reason = loop {
        if *shutdown_rx.borrow() {
            break StopReason::Shutdown;
        }

        let next = tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break StopReason::Shutdown;
                }
                continue;
            }
            next = source.recv() => next,
        };

        match next {
            Ok(Some(message)) => {
                pipeline.handle(message).await;
            }
            Ok(None) => break StopReason::SourceClosed,
            Err(error) => {
                PipelineMetrics::incr(&pipeline.metrics().receive_failed);
                tracing::warn!(
                    error = %error,
                    retry_delay_ms = config.retry_delay.as_millis() as u64,
                    "failed to receive message"
                );
                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break StopReason::Shutdown;
                        }
                    }
                    _ = tokio::time::sleep(config.retry_delay) => {}
                }
            }
        }
    };

    let snapshot = pipeline.snapshot();
    tracing::info!(
        reason = ?reason,
        received = snapshot.received,
        stored = snapshot.stored,
        malformed = snapshot.malformed,
        invalid = snapshot.invalid,
        persist_failed = snapshot.persist_failed,
        committed = snapshot.committed,
        "ingestion pipeline stopped"
    );
    (reason, snapshot)
}
