//! Pipeline configuration and metrics

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{ConsumerConfig, PipelineSettings, UnionPolicy};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Topic stamped on every decoded message
    pub topic: String,

    /// Instrumentation scope recorded on the consume span
    pub instrumentation_name: String,

    /// Union unwrapping policy
    pub union_policy: UnionPolicy,
}

impl PipelineConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            instrumentation_name: "record-bridge".to_string(),
            union_policy: UnionPolicy::default(),
        }
    }

    /// Derive from the service blueprint sections
    pub fn from_blueprint(consumer: &ConsumerConfig, settings: &PipelineSettings) -> Self {
        Self {
            topic: consumer.topic.clone(),
            instrumentation_name: consumer.trace_instrumentation_name.clone(),
            union_policy: settings.union_policy,
        }
    }

    pub fn with_union_policy(mut self, union_policy: UnionPolicy) -> Self {
        self.union_policy = union_policy;
        self
    }
}

/// Pipeline metrics
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Raw records pulled from the source
    pub records_received: AtomicU64,

    /// Records rejected by the filter
    pub records_filtered: AtomicU64,

    /// Records handed to the decoded channel
    pub records_decoded: AtomicU64,

    /// Records handed to the error channel
    pub decode_errors: AtomicU64,

    /// Transport errors forwarded by the source
    pub transport_errors: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filtered(&self) {
        self.records_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decoded(&self) {
        self.records_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_received: self.records_received.load(Ordering::Relaxed),
            records_filtered: self.records_filtered.load(Ordering::Relaxed),
            records_decoded: self.records_decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_received: u64,
    pub records_filtered: u64,
    pub records_decoded: u64,
    pub decode_errors: u64,
    pub transport_errors: u64,
}
