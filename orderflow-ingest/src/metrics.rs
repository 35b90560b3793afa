//! Pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for ingestion activity since startup.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Messages taken from the source
    pub received: AtomicU64,
    /// Orders persisted and cached
    pub stored: AtomicU64,
    /// Payloads that did not decode
    pub malformed: AtomicU64,
    /// Orders that failed validation
    pub invalid: AtomicU64,
    /// Orders the store refused or could not take
    pub persist_failed: AtomicU64,
    /// Positions committed
    pub committed: AtomicU64,
    /// Commits the broker rejected
    pub commit_failed: AtomicU64,
    /// Failed receive attempts
    pub receive_failed: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of all counters.
    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            received: self.received.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            persist_failed: self.persist_failed.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            commit_failed: self.commit_failed.load(Ordering::Relaxed),
            receive_failed: self.receive_failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pipeline counters at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSnapshot {
    pub received: u64,
    pub stored: u64,
    pub malformed: u64,
    pub invalid: u64,
    pub persist_failed: u64,
    pub committed: u64,
    pub commit_failed: u64,
    pub receive_failed: u64,
}

impl PipelineSnapshot {
    /// Messages dropped because of bad input.
    pub fn rejected_input(&self) -> u64 {
        self.malformed + self.invalid
    }

    /// Labelled counters, for exporters.
    pub fn labelled(&self) -> [(&'static str, u64); 8] {
        [
            ("received", self.received),
            ("stored", self.stored),
            ("malformed", self.malformed),
            ("invalid", self.invalid),
            ("persist_failed", self.persist_failed),
            ("committed", self.committed),
            ("commit_failed", self.commit_failed),
            ("receive_failed", self.receive_failed),
        ]
    }
}
