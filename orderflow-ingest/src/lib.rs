//! orderflow ingestion
//!
//! Pulls raw payloads from a message source and carries each one through
//! decode, validation, persistence and cache update before committing its
//! stream position.

mod metrics;
mod pipeline;
mod runner;
mod source;

pub use metrics::{PipelineMetrics, PipelineSnapshot};
pub use pipeline::{IngestPipeline, Outcome, Rejection};
pub use runner::{run_pipeline, RunnerConfig, StopReason};
pub use source::{
    Acknowledge, CommitLog, InboundMessage, MemorySender, MemorySource, MessageSource,
    StreamPosition,
};
