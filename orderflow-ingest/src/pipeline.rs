//! The consume, validate, persist, cache, commit pipeline.
//!
//! One message is carried through every step before the next is looked at.
//! The cache is only written after the store accepted the order, and the
//! position is only committed after the cache was written. Any failure leaves
//! the position uncommitted so the broker redelivers it after a restart.

use crate::metrics::{PipelineMetrics, PipelineSnapshot};
use crate::source::{InboundMessage, StreamPosition};
use orderflow_core::{decode_order, DecodeError, Order, OrderflowError, ValidationError, Validator};
use orderflow_storage::{OrderCache, OrderStore};
use std::sync::Arc;
use thiserror::Error;

/// Why a message was not stored.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("malformed payload: {0}")]
    Malformed(DecodeError),

    #[error("invalid order: {0}")]
    Invalid(ValidationError),

    #[error("persist failed: {0}")]
    Persist(OrderflowError),
}

impl Rejection {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::Malformed(_) => "malformed",
            Rejection::Invalid(_) => "invalid",
            Rejection::Persist(_) => "persist_failed",
        }
    }

    /// True for bad data, false for infrastructure trouble.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, Rejection::Persist(_))
    }
}

/// Result of handling one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Stored, cached and committed.
    Committed {
        order_uid: String,
        position: StreamPosition,
    },
    /// Stored and cached, but the broker refused the commit.
    CommitFailed {
        order_uid: String,
        position: StreamPosition,
        error: OrderflowError,
    },
    /// Not stored. Position left uncommitted.
    Rejected {
        position: StreamPosition,
        rejection: Rejection,
    },
}

impl Outcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed { .. })
    }
}

/// Ingestion pipeline over a cache, a store and a validator.
pub struct IngestPipeline<C: ?Sized, S: ?Sized, V> {
    cache: Arc<C>,
    store: Arc<S>,
    validator: V,
    metrics: Arc<PipelineMetrics>,
}

impl<C, S, V> IngestPipeline<C, S, V>
where
    C: OrderCache + ?Sized,
    S: OrderStore + ?Sized,
    V: Validator,
{
    pub fn new(cache: Arc<C>, store: Arc<S>, validator: V) -> Self {
        Self {
            cache,
            store,
            validator,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Share an existing counter set, e.g. one already exposed to a scraper.
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.metrics.snapshot()
    }

    /// Decode, validate, persist and cache one payload.
    ///
    /// Does not commit and does not touch the counters.
    pub async fn process(&self, payload: &[u8]) -> Result<Order, Rejection> {
        let order = decode_order(payload).map_err(Rejection::Malformed)?;
        self.validator.check(&order).map_err(Rejection::Invalid)?;
        self.store.upsert(&order).await.map_err(Rejection::Persist)?;
        self.cache.set(order.clone());
        Ok(order)
    }

    /// Carry one message through the pipeline, committing it on success.
    pub async fn handle(&self, message: InboundMessage) -> Outcome {
        PipelineMetrics::incr(&self.metrics.received);
        let position = message.position().clone();

        let order = match self.process(message.payload()).await {
            Ok(order) => order,
            Err(rejection) => {
                self.record_rejection(&position, &rejection);
                return Outcome::Rejected {
                    position,
                    rejection,
                };
            }
        };

        PipelineMetrics::incr(&self.metrics.stored);
        tracing::info!(
            order_uid = %order.order_uid,
            partition = position.partition,
            offset = position.offset,
            items = order.items.len(),
            "stored order"
        );

        match message.commit().await {
            Ok(()) => {
                PipelineMetrics::incr(&self.metrics.committed);
                Outcome::Committed {
                    order_uid: order.order_uid,
                    position,
                }
            }
            Err(error) => {
                PipelineMetrics::incr(&self.metrics.commit_failed);
                tracing::error!(
                    order_uid = %order.order_uid,
                    partition = position.partition,
                    offset = position.offset,
                    error = %error,
                    "commit failed, message will be redelivered"
                );
                Outcome::CommitFailed {
                    order_uid: order.order_uid,
                    position,
                    error,
                }
            }
        }
    }

    fn record_rejection(&self, position: &StreamPosition, rejection: &Rejection) {
        match rejection {
            Rejection::Malformed(_) => PipelineMetrics::incr(&self.metrics.malformed),
            Rejection::Invalid(_) => PipelineMetrics::incr(&self.metrics.invalid),
            Rejection::Persist(_) => PipelineMetrics::incr(&self.metrics.persist_failed),
        }

        if rejection.is_input_error() {
            tracing::warn!(
                kind = rejection.kind(),
                partition = position.partition,
                offset = position.offset,
                reason = %rejection,
                "rejected message"
            );
        } else {
            tracing::error!(
                kind = rejection.kind(),
                partition = position.partition,
                offset = position.offset,
                error = %rejection,
                "failed to persist order"
            );
        }
    }
}
