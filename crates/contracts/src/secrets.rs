//! SecretStore trait - secret lookup abstraction

use std::collections::HashMap;

use serde_json::Value;

use crate::ContractError;

/// Fields of one secret
pub type SecretMap = HashMap<String, Value>;

/// Secret store keyed by path
#[trait_variant::make(SecretStore: Send)]
pub trait LocalSecretStore {
    /// Fetch all fields stored under `path`
    ///
    /// # Errors
    /// `ContractError::Config` when the secret does not exist or the store is unreachable
    async fn get_secret(&self, path: &str) -> Result<SecretMap, ContractError>;
}

/// Read a required, non-empty string field from a secret
pub fn require_str(secret: &SecretMap, path: &str, field: &str) -> Result<String, ContractError> {
    match secret.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(ContractError::config(
            format!("{path}.{field}"),
            "secret field is empty",
        )),
        Some(_) => Err(ContractError::config(
            format!("{path}.{field}"),
            "secret field is not a string",
        )),
        None => Err(ContractError::config(
            format!("{path}.{field}"),
            "missing secret field",
        )),
    }
}
