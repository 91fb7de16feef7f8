//! LogSink - logs message summaries via tracing

use contracts::{ContractError, DecodedMessage, MessageSink};
use tracing::{info, instrument};

/// Sink that logs messages instead of delivering them (dry runs, debugging)
pub struct LogSink {
    name: String,
    count: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
        }
    }

    /// Messages logged so far
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl MessageSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_upsert",
        skip(self, message),
        fields(sink = %self.name, key = %message.key)
    )]
    async fn upsert(&mut self, message: &DecodedMessage) -> Result<(), ContractError> {
        self.count += 1;
        info!(
            sink = %self.name,
            topic = %message.topic,
            payload = message.payload_str().unwrap_or("<binary>"),
            "upserted message"
        );
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, messages = self.count, "LogSink closed");
        Ok(())
    }
}
