//! Bridge run statistics.

use std::time::Duration;

use dispatcher::StopReason;
use observability::BridgeSummary;

/// Statistics from a bridge run
#[derive(Debug, Clone)]
pub struct BridgeStats {
    /// Consumed topic
    pub topic: String,

    /// Record and delivery counters
    pub summary: BridgeSummary,

    /// Why delivery stopped (None = fatal failure)
    pub stop: Option<StopReason>,

    /// Outcome reports that could not be recorded
    pub reporter_failures: u64,

    /// Total duration of the run
    pub duration: Duration,
}

impl BridgeStats {
    /// Delivered messages per second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.summary.messages_delivered as f64 / secs
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!();
        println!("Topic: {}", self.topic);
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!("Throughput: {:.2} msg/s", self.throughput());
        match self.stop {
            Some(StopReason::ChannelsClosed) => println!("Stopped: source drained"),
            Some(StopReason::Cancelled) => println!("Stopped: cancelled"),
            None => println!("Stopped: fatal failure"),
        }
        if self.reporter_failures > 0 {
            println!("Outcome reports failed: {}", self.reporter_failures);
        }
        println!();
        print!("{}", self.summary);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_handles_zero_duration() {
        let stats = BridgeStats {
            topic: "orders".to_string(),
            summary: BridgeSummary {
                messages_delivered: 10,
                ..Default::default()
            },
            stop: Some(StopReason::ChannelsClosed),
            reporter_failures: 0,
            duration: Duration::ZERO,
        };
        assert_eq!(stats.throughput(), 0.0);

        let stats = BridgeStats {
            duration: Duration::from_secs(2),
            ..stats
        };
        assert_eq!(stats.throughput(), 5.0);
    }
}
