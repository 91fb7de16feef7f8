//! # Registry
//!
//! Schema registry access.
//!
//! Responsibilities:
//! - Look up secrets (memory, file, Vault KV v2)
//! - Fetch the latest schema of a subject over HTTP
//! - Produce the `EncodingDescriptor` the pipeline decodes against

pub mod client;
pub mod error;
pub mod resolver;
pub mod secrets;

pub use client::{RegistryCredentials, SchemaRegistryClient};
pub use error::{RegistryError, Result};
pub use resolver::SchemaResolver;
pub use secrets::{AnySecretStore, FileSecretStore, MemorySecretStore, VaultSecretStore};
