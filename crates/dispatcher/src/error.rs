//! Dispatcher error types

use contracts::{ContractError, PipelineError};
use thiserror::Error;

/// Dispatcher setup errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Reporter creation error
    #[error("failed to create outcome reporter: {message}")]
    ReporterCreation { message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<DispatcherError> for ContractError {
    fn from(err: DispatcherError) -> Self {
        match err {
            DispatcherError::Contract(e) => e,
            other => ContractError::Other(other.to_string()),
        }
    }
}

/// Failure that ends the dispatch loop
///
/// Failed upserts are never retried locally. The process is expected to exit
/// and be restarted by its supervisor, with the stream replaying from the last
/// committed offset.
#[derive(Debug, Error)]
pub enum FatalError {
    /// Sink rejected or could not receive a message
    #[error("upsert of message '{key}' failed: {source}")]
    Sink {
        key: String,
        #[source]
        source: ContractError,
    },

    /// Pipeline reported a record it could not decode
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

impl FatalError {
    /// Key of the record that caused the failure, if known
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Sink { key, .. } => Some(key),
            Self::Pipeline(e) => e.key(),
        }
    }

    /// Underlying cause
    pub fn cause(&self) -> &ContractError {
        match self {
            Self::Sink { source, .. } => source,
            Self::Pipeline(e) => e.cause(),
        }
    }
}
