//! Dispatch metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for the dispatch loop
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Messages upserted successfully
    delivered: AtomicU64,
    /// Failed upserts
    failed: AtomicU64,
    /// Decode failures received from the pipeline
    pipeline_errors: AtomicU64,
    /// Reporter calls that failed
    reporter_failures: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pipeline_errors(&self) -> u64 {
        self.pipeline_errors.load(Ordering::Relaxed)
    }

    pub fn inc_pipeline_errors(&self) {
        self.pipeline_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reporter_failures(&self) -> u64 {
        self.reporter_failures.load(Ordering::Relaxed)
    }

    pub fn inc_reporter_failures(&self) {
        self.reporter_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            delivered: self.delivered(),
            failed: self.failed(),
            pipeline_errors: self.pipeline_errors(),
            reporter_failures: self.reporter_failures(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub delivered: u64,
    pub failed: u64,
    pub pipeline_errors: u64,
    pub reporter_failures: u64,
}
