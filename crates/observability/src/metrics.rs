//! Bridge metrics
//!
//! Recorders for the `metrics` facade (no-op until a recorder is installed)
//! and an in-memory summary for end-of-run reporting.

use contracts::ContractError;
use metrics::{counter, gauge, histogram};

/// Stable label for an error category
pub fn error_label(error: &ContractError) -> &'static str {
    match error {
        ContractError::Config { .. } | ContractError::ConfigParse { .. } => "config",
        ContractError::Resolution { .. } => "resolution",
        ContractError::UnexpectedData { .. } => "unexpected_data",
        ContractError::DeserializationFailed { .. } => "deserialization_failed",
        ContractError::Transport { .. } => "transport",
        ContractError::Api { .. } => "api",
        ContractError::SinkConnection { .. } => "sink_connection",
        ContractError::Serialization(_) => "serialization",
        ContractError::Io(_) => "io",
        ContractError::Other(_) => "other",
    }
}

/// Record a raw record pulled from the stream
pub fn record_record_received(topic: &str) {
    counter!(
        "record_bridge_records_received_total",
        "topic" => topic.to_string()
    )
    .increment(1);
}

/// Record a raw record rejected by the filter
pub fn record_record_filtered(topic: &str) {
    counter!(
        "record_bridge_records_filtered_total",
        "topic" => topic.to_string()
    )
    .increment(1);
}

/// Record a record that failed to decode
pub fn record_decode_error(topic: &str, error: &ContractError) {
    counter!(
        "record_bridge_decode_errors_total",
        "topic" => topic.to_string(),
        "reason" => error_label(error)
    )
    .increment(1);
}

/// Record a transport-level error forwarded by the stream source
pub fn record_transport_error(topic: &str) {
    counter!(
        "record_bridge_transport_errors_total",
        "topic" => topic.to_string()
    )
    .increment(1);
}

/// Record a sink upsert outcome
pub fn record_message_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "record_bridge_messages_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record sink upsert latency
pub fn record_upsert_latency_ms(sink_name: &str, latency_ms: f64) {
    histogram!(
        "record_bridge_upsert_latency_ms",
        "sink" => sink_name.to_string()
    )
    .record(latency_ms);
}

/// Record whether a consumer is running
pub fn record_consumer_up(topic: &str, up: bool) {
    gauge!(
        "record_bridge_consumer_up",
        "topic" => topic.to_string()
    )
    .set(if up { 1.0 } else { 0.0 });
}

/// End-of-run summary
#[derive(Debug, Clone, Default)]
pub struct BridgeSummary {
    pub records_received: u64,
    pub records_filtered: u64,
    pub records_decoded: u64,
    pub decode_errors: u64,
    pub transport_errors: u64,
    pub messages_delivered: u64,
    pub messages_failed: u64,
    pub upsert_latency_ms: StatsSummary,
}

impl BridgeSummary {
    /// Share of received records that were filtered out, in percent
    pub fn filter_rate(&self) -> f64 {
        if self.records_received == 0 {
            0.0
        } else {
            self.records_filtered as f64 / self.records_received as f64 * 100.0
        }
    }
}

impl std::fmt::Display for BridgeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Bridge Summary ===")?;
        writeln!(f, "Records received: {}", self.records_received)?;
        writeln!(
            f,
            "Records filtered: {} ({:.2}%)",
            self.records_filtered,
            self.filter_rate()
        )?;
        writeln!(f, "Records decoded: {}", self.records_decoded)?;
        writeln!(f, "Decode errors: {}", self.decode_errors)?;
        writeln!(f, "Transport errors: {}", self.transport_errors)?;
        writeln!(f, "Messages delivered: {}", self.messages_delivered)?;
        writeln!(f, "Messages failed: {}", self.messages_failed)?;
        writeln!(f, "Upsert latency (ms): {}", self.upsert_latency_ms)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::EncodingKind;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(value);
        }

        let summary = stats.summary();
        assert_eq!(summary.count, 5);
        assert!((summary.mean - 3.0).abs() < 1e-10);
        assert!((summary.min - 1.0).abs() < 1e-10);
        assert!((summary.max - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_error_labels() {
        assert_eq!(
            error_label(&ContractError::UnexpectedData {
                kind: EncodingKind::Json
            }),
            "unexpected_data"
        );
        assert_eq!(
            error_label(&ContractError::DeserializationFailed { found: "string" }),
            "deserialization_failed"
        );
    }

    #[test]
    fn test_recorders_without_installed_recorder() {
        record_record_received("customers");
        record_decode_error("customers", &ContractError::transport("reset"));
        record_message_dispatched("crm", true);
        record_upsert_latency_ms("crm", 12.5);
        record_consumer_up("customers", false);
    }

    #[test]
    fn test_summary_display() {
        let summary = BridgeSummary {
            records_received: 200,
            records_filtered: 50,
            records_decoded: 149,
            decode_errors: 1,
            transport_errors: 0,
            messages_delivered: 149,
            messages_failed: 0,
            upsert_latency_ms: StatsSummary {
                count: 149,
                min: 20.0,
                max: 80.0,
                mean: 50.0,
                std_dev: 15.0,
            },
        };

        let output = format!("{summary}");
        assert!(output.contains("Records received: 200"));
        assert!(output.contains("25.00%"));
        assert!(output.contains("n=149"));
    }
}
