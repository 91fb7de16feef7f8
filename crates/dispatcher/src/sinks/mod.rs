//! Sink implementations

pub mod log;
pub mod rest;

pub use log::LogSink;
pub use rest::{RestSink, RestSinkConfig};

use contracts::{ContractError, DecodedMessage, MessageSink, SecretStore, SinkConfig, SinkType};
use tracing::info;

use crate::error::DispatcherError;

/// Sink selected by configuration
pub enum AnySink {
    Rest(RestSink),
    Log(LogSink),
}

impl MessageSink for AnySink {
    fn name(&self) -> &str {
        match self {
            Self::Rest(sink) => sink.name(),
            Self::Log(sink) => sink.name(),
        }
    }

    async fn upsert(&mut self, message: &DecodedMessage) -> Result<(), ContractError> {
        match self {
            Self::Rest(sink) => sink.upsert(message).await,
            Self::Log(sink) => sink.upsert(message).await,
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Rest(sink) => sink.close().await,
            Self::Log(sink) => sink.close().await,
        }
    }
}

/// Create a sink from its configuration
///
/// REST sinks read their connection config from `secret_path` and
/// authenticate before returning.
pub async fn create_sink<S: SecretStore + Sync>(
    config: &SinkConfig,
    secrets: &S,
    secret_path: &str,
) -> Result<AnySink, DispatcherError> {
    let sink = match config.sink_type {
        SinkType::Log => AnySink::Log(LogSink::new(&config.name)),
        SinkType::Rest => {
            let secret = secrets.get_secret(secret_path).await?;
            let rest_config = RestSinkConfig::from_secret(
                &secret,
                secret_path,
                &config.object,
                config.request_timeout_secs,
            )?;
            let sink = RestSink::connect(&config.name, rest_config)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            AnySink::Rest(sink)
        }
    };
    info!(sink = %config.name, sink_type = ?config.sink_type, "Sink created");
    Ok(sink)
}
