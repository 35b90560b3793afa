//! Shared handler state.

use orderflow_ingest::PipelineMetrics;
use orderflow_storage::{OrderCache, OrderReader, OrderStore};
use std::sync::Arc;
use std::time::Instant;

/// State handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub reader: OrderReader<dyn OrderCache, dyn OrderStore>,
    /// Counters of the running pipeline, absent when serving without one.
    pub pipeline: Option<Arc<PipelineMetrics>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(cache: Arc<dyn OrderCache>, store: Arc<dyn OrderStore>) -> Self {
        Self {
            reader: OrderReader::new(cache, store),
            pipeline: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_pipeline_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.pipeline = Some(metrics);
        self
    }

    pub fn cache(&self) -> &Arc<dyn OrderCache> {
        self.reader.cache()
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        self.reader.store()
    }
}
