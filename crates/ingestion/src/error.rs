//! Ingestion error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Replay file could not be read
    #[error("failed to read replay file {path}: {source}")]
    ReplayIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Replay line is not a valid record
    #[error("invalid replay record at {path}:{line}: {message}")]
    ReplayRecord {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Source channel has no receiver
    #[error("record source '{name}' is closed")]
    SourceClosed { name: String },
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::ReplayIo { path, source } => ContractError::config(
                path.display().to_string(),
                format!("cannot read replay file: {source}"),
            ),
            IngestionError::ReplayRecord { path, line, message } => ContractError::config(
                format!("{}:{line}", path.display()),
                message,
            ),
            IngestionError::SourceClosed { name } => {
                ContractError::transport(format!("record source '{name}' is closed"))
            }
        }
    }
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
