//! Error types for CLI operations.

use contracts::ContractError;
use dispatcher::FatalError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Neither the CLI nor the configuration names a record source
    #[error("No record source configured: set source.replay_path or pass --replay")]
    NoRecordSource,

    /// Startup step failed before any task was started
    #[error("Startup failed during {stage}: {source}")]
    Startup {
        stage: &'static str,
        #[source]
        source: ContractError,
    },

    /// Delivery stopped on a fatal failure
    #[error("Bridge stopped: {0}")]
    Fatal(#[from] FatalError),

    /// A bridge task panicked or was aborted
    #[error("Bridge task failed: {message}")]
    TaskFailed { message: String },

    /// Generic error wrapper
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn startup(stage: &'static str, source: impl Into<ContractError>) -> Self {
        Self::Startup {
            stage,
            source: source.into(),
        }
    }

    pub fn task_failed(message: impl Into<String>) -> Self {
        Self::TaskFailed {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
