//! Secret store backends
//!
//! - `MemorySecretStore`: inline secrets (tests, local development)
//! - `FileSecretStore`: TOML/JSON document with one table per secret path
//! - `VaultSecretStore`: HashiCorp Vault KV v2 over HTTP
//! - `AnySecretStore`: config-driven selection

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use contracts::{ContractError, SecretMap, SecretStore, SecretsConfig};
use serde::Deserialize;
use tracing::{debug, instrument};

/// In-memory secret store
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    entries: HashMap<String, SecretMap>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret, builder style
    pub fn with_secret(mut self, path: impl Into<String>, secret: SecretMap) -> Self {
        self.insert(path, secret);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, secret: SecretMap) {
        self.entries.insert(path.into(), secret);
    }
}

impl From<HashMap<String, SecretMap>> for MemorySecretStore {
    fn from(entries: HashMap<String, SecretMap>) -> Self {
        Self { entries }
    }
}

impl SecretStore for MemorySecretStore {
    async fn get_secret(&self, path: &str) -> Result<SecretMap, ContractError> {
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| ContractError::config(path, "secret not found"))
    }
}

/// File-backed secret store
///
/// The document is read once at open time. Each top-level table is one secret:
///
/// ```toml
/// ["schema-registry/info"]
/// schema-registry-url = "https://registry.example.com"
/// ```
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
    inner: MemorySecretStore,
}

impl FileSecretStore {
    /// Read and parse the secrets document
    ///
    /// Format is detected from the extension (`.json`, anything else is TOML).
    pub fn open(path: &Path) -> Result<Self, ContractError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ContractError::config(path.display().to_string(), format!("cannot read: {e}"))
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let entries: HashMap<String, SecretMap> = if is_json {
            serde_json::from_str(&content).map_err(|e| {
                ContractError::config(path.display().to_string(), format!("invalid JSON: {e}"))
            })?
        } else {
            toml::from_str(&content).map_err(|e| {
                ContractError::config(path.display().to_string(), format!("invalid TOML: {e}"))
            })?
        };

        debug!(path = %path.display(), secrets = entries.len(), "Secrets file loaded");

        Ok(Self {
            path: path.to_path_buf(),
            inner: MemorySecretStore::from(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SecretStore for FileSecretStore {
    async fn get_secret(&self, path: &str) -> Result<SecretMap, ContractError> {
        self.inner.get_secret(path).await
    }
}

/// Vault KV v2 read response
#[derive(Debug, Deserialize)]
struct KvResponse {
    data: KvData,
}

#[derive(Debug, Deserialize)]
struct KvData {
    data: SecretMap,
}

/// HashiCorp Vault KV v2 secret store
///
/// Reads `GET {address}/v1/{mount}/data/{path}` with the `X-Vault-Token` header.
#[derive(Debug, Clone)]
pub struct VaultSecretStore {
    address: String,
    mount: String,
    token: String,
    http_client: reqwest::Client,
}

impl VaultSecretStore {
    pub fn new(
        address: impl Into<String>,
        mount: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            mount: mount.into(),
            token: token.into(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Create a store with the token read from an environment variable
    pub fn from_env(
        address: impl Into<String>,
        mount: impl Into<String>,
        token_env: &str,
    ) -> Result<Self, ContractError> {
        let token = std::env::var(token_env)
            .map_err(|_| ContractError::config(token_env, "vault token not set"))?;
        Ok(Self::new(address, mount, token))
    }

    fn secret_url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}/data/{}",
            self.address.trim_end_matches('/'),
            self.mount.trim_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl SecretStore for VaultSecretStore {
    #[instrument(name = "vault_get_secret", skip(self), fields(path = %path))]
    async fn get_secret(&self, path: &str) -> Result<SecretMap, ContractError> {
        let url = self.secret_url(path);

        let response = self
            .http_client
            .get(&url)
            .header("X-Vault-Token", &self.token)
            .send()
            .await
            .map_err(|e| ContractError::config(path, format!("vault unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContractError::config(
                path,
                format!("vault responded with status {}", status.as_u16()),
            ));
        }

        let body: KvResponse = response
            .json()
            .await
            .map_err(|e| ContractError::config(path, format!("invalid vault response: {e}")))?;

        Ok(body.data.data)
    }
}

/// Config-driven secret store selection
#[derive(Debug, Clone)]
pub enum AnySecretStore {
    Memory(MemorySecretStore),
    File(FileSecretStore),
    Vault(VaultSecretStore),
}

impl AnySecretStore {
    /// Build the backend described by the `[secrets]` section
    pub fn from_config(config: &SecretsConfig) -> Result<Self, ContractError> {
        match config {
            SecretsConfig::Memory { entries } => {
                Ok(Self::Memory(MemorySecretStore::from(entries.clone())))
            }
            SecretsConfig::File { path } => Ok(Self::File(FileSecretStore::open(path)?)),
            SecretsConfig::Vault {
                address,
                mount,
                token_env,
            } => Ok(Self::Vault(VaultSecretStore::from_env(
                address.as_str(),
                mount.as_str(),
                token_env,
            )?)),
        }
    }

    /// Backend name (used for logging)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::File(_) => "file",
            Self::Vault(_) => "vault",
        }
    }
}

impl SecretStore for AnySecretStore {
    async fn get_secret(&self, path: &str) -> Result<SecretMap, ContractError> {
        match self {
            Self::Memory(store) => store.get_secret(path).await,
            Self::File(store) => store.get_secret(path).await,
            Self::Vault(store) => store.get_secret(path).await,
        }
    }
}
