//! Registry error types

use contracts::ContractError;
use thiserror::Error;

/// Schema registry specific error
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Registry could not be reached
    #[error("request to '{url}' failed: {message}")]
    RequestFailed { url: String, message: String },

    /// Subject has no registered schema
    #[error("subject '{subject}' not found")]
    SubjectNotFound { subject: String },

    /// Non-2xx response other than 404
    #[error("registry responded with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body is not a registry schema document
    #[error("invalid registry response: {message}")]
    InvalidResponse { message: String },

    /// `schemaType` is not a known encoding kind
    #[error("unknown schema type '{schema_type}'")]
    UnknownSchemaType { schema_type: String },

    /// Registered Avro schema does not parse
    #[error("invalid Avro schema: {message}")]
    InvalidSchema { message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl RegistryError {
    /// Create request failure
    pub fn request_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Convert into the shared taxonomy
    ///
    /// Wrapped contract errors (missing secrets) keep their category, every
    /// registry failure becomes a resolution error for `subject`.
    pub fn into_contract(self, subject: &str) -> ContractError {
        match self {
            Self::Contract(e) => e,
            other => ContractError::resolution(subject, other.to_string()),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_failures_become_resolution_errors() {
        let err = RegistryError::SubjectNotFound {
            subject: "orders".into(),
        }
        .into_contract("orders");
        assert!(matches!(err, ContractError::Resolution { .. }));
        assert!(err.to_string().contains("'orders' not found"));
    }

    #[test]
    fn contract_errors_pass_through() {
        let err = RegistryError::from(ContractError::config("kv/info.url", "missing"))
            .into_contract("orders");
        assert!(matches!(err, ContractError::Config { .. }));
    }
}
