//! Layered error definitions
//!
//! Categorized by stage: startup (config / resolution) / per-record decode / sink / transport

use std::fmt;

use thiserror::Error;

use crate::EncodingKind;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Startup Errors =====
    /// Missing or malformed configuration, secret or connection field
    #[error("config error at '{field}': {message}")]
    Config { field: String, message: String },

    /// Configuration document could not be parsed
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Schema registry unreachable, subject not found or schema unusable
    #[error("schema resolution failed for subject '{subject}': {message}")]
    Resolution { subject: String, message: String },

    // ===== Per-record Errors =====
    /// Descriptor kind is not decodable by the pipeline
    #[error("unexpected data: unsupported encoding kind {kind}")]
    UnexpectedData { kind: EncodingKind },

    /// Record value does not have the expected shape
    #[error("could not deserialize value: expected a mapping, found {found}")]
    DeserializationFailed { found: &'static str },

    /// Transport-level failure forwarded by the stream source
    #[error("transport error: {message}")]
    Transport { message: String },

    // ===== Sink Errors =====
    /// Non-2xx response from a downstream HTTP API
    #[error("'{sink_name}' responded with status {status}: {body}")]
    Api {
        sink_name: String,
        status: u16,
        body: String,
    },

    /// Sink could not reach its endpoint
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== General Errors =====
    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration error
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create schema resolution error
    pub fn resolution(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create sink connection error
    pub fn sink_connection(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkConnection {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error prevents the service from starting
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::ConfigParse { .. } | Self::Resolution { .. }
        )
    }
}

/// Per-record pipeline failure
///
/// Wraps the underlying cause with the key and a rendering of the offending
/// record value for diagnostics. Never retried.
#[derive(Debug)]
pub struct PipelineError {
    cause: ContractError,
    key: Option<String>,
    value: Option<String>,
}

impl PipelineError {
    pub fn new(cause: ContractError) -> Self {
        Self {
            cause,
            key: None,
            value: None,
        }
    }

    /// Attach the record key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attach a rendering of the record value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn cause(&self) -> &ContractError {
        &self.cause
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn into_cause(self) -> ContractError {
        self.cause
    }
}

impl From<ContractError> for PipelineError {
    fn from(cause: ContractError) -> Self {
        Self::new(cause)
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}\n{}", self.cause, value),
            None => write!(f, "{}", self.cause),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}
