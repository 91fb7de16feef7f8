//! SchemaResolver - startup schema lookup
//!
//! Reads registry credentials and endpoint from the secret store, then fetches
//! the latest schema for a subject. Nothing is cached across calls.

use contracts::{require_str, ConsumerConfig, ContractError, EncodingDescriptor, SecretStore};
use tracing::{info, instrument};

use crate::client::{RegistryCredentials, SchemaRegistryClient};

/// Credential secret field: registry API key
pub const REGISTRY_KEY_FIELD: &str = "schema_registry_key";
/// Credential secret field: registry API secret
pub const REGISTRY_SECRET_FIELD: &str = "schema_registry_secret";
/// Info secret field: registry base URL
pub const REGISTRY_URL_FIELD: &str = "schema-registry-url";

/// Resolves the encoding descriptor of a subject
pub struct SchemaResolver<S> {
    secrets: S,
    schema_info_path: String,
    schema_creds_path: String,
}

impl<S: SecretStore + Sync> SchemaResolver<S> {
    /// Create a resolver
    ///
    /// `schema_creds_path` may contain a `{system}` placeholder.
    pub fn new(
        secrets: S,
        schema_info_path: impl Into<String>,
        schema_creds_path: impl Into<String>,
    ) -> Self {
        Self {
            secrets,
            schema_info_path: schema_info_path.into(),
            schema_creds_path: schema_creds_path.into(),
        }
    }

    /// Create a resolver for a consumer's configured secret paths
    pub fn for_consumer(secrets: S, consumer: &ConsumerConfig) -> Self {
        Self::new(
            secrets,
            consumer.schema_info_path.as_str(),
            consumer.schema_creds_path.as_str(),
        )
    }

    /// Resolve the consumer's topic against the registry
    pub async fn resolve_consumer(
        &self,
        consumer: &ConsumerConfig,
    ) -> Result<EncodingDescriptor, ContractError> {
        self.resolve(&consumer.topic, &consumer.system).await
    }

    /// Resolve the latest schema registered under `subject`
    ///
    /// # Errors
    /// - `ContractError::Config`: secret or secret field missing
    /// - `ContractError::Resolution`: registry unreachable, subject unknown,
    ///   response or schema unusable
    #[instrument(name = "schema_resolve", skip(self), fields(subject = %subject, system = %system))]
    pub async fn resolve(
        &self,
        subject: &str,
        system: &str,
    ) -> Result<EncodingDescriptor, ContractError> {
        let credentials = self.credentials(system).await?;

        let client = SchemaRegistryClient::new(credentials).map_err(|e| e.into_contract(subject))?;
        let descriptor = client
            .get_by_subject(subject)
            .await
            .map_err(|e| e.into_contract(subject))?;

        info!(
            subject = %descriptor.subject,
            schema_id = descriptor.id,
            version = descriptor.version,
            kind = %descriptor.kind,
            "Schema resolved"
        );

        Ok(descriptor)
    }

    async fn credentials(&self, system: &str) -> Result<RegistryCredentials, ContractError> {
        let creds_path = self.schema_creds_path.replace("{system}", system);

        let creds = self.secrets.get_secret(&creds_path).await?;
        let info = self.secrets.get_secret(&self.schema_info_path).await?;

        Ok(RegistryCredentials {
            url: require_str(&info, &self.schema_info_path, REGISTRY_URL_FIELD)?,
            key: require_str(&creds, &creds_path, REGISTRY_KEY_FIELD)?,
            secret: require_str(&creds, &creds_path, REGISTRY_SECRET_FIELD)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::MemorySecretStore;
    use contracts::{EncodingKind, SecretMap};
    use mockito::Server;
    use serde_json::json;

    fn store(url: &str) -> MemorySecretStore {
        MemorySecretStore::new()
            .with_secret(
                "schema-registry/info",
                SecretMap::from([(REGISTRY_URL_FIELD.to_string(), json!(url))]),
            )
            .with_secret(
                "crm/schema-registry",
                SecretMap::from([
                    (REGISTRY_KEY_FIELD.to_string(), json!("key")),
                    (REGISTRY_SECRET_FIELD.to_string(), json!("secret")),
                ]),
            )
    }

    fn resolver(store: MemorySecretStore) -> SchemaResolver<MemorySecretStore> {
        SchemaResolver::new(store, "schema-registry/info", "{system}/schema-registry")
    }

    #[tokio::test]
    async fn resolves_with_substituted_credentials_path() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/subjects/customers/versions/latest")
            .with_status(200)
            .with_body(
                json!({
                    "id": 5,
                    "version": 2,
                    "schema": r#"{"type":"record","name":"C","fields":[]}"#
                })
                .to_string(),
            )
            .create_async()
            .await;

        let descriptor = resolver(store(&server.url()))
            .resolve("customers", "crm")
            .await
            .unwrap();
        assert_eq!(descriptor.kind(), EncodingKind::Avro);
        assert_eq!(descriptor.id, 5);
    }

    #[tokio::test]
    async fn missing_credentials_secret_is_config_error() {
        let err = resolver(store("http://unused"))
            .resolve("customers", "billing")
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Config { .. }));
        assert!(err.to_string().contains("billing/schema-registry"));
    }

    #[tokio::test]
    async fn non_string_field_is_config_error() {
        let mut secrets = store("http://unused");
        secrets.insert(
            "crm/schema-registry",
            SecretMap::from([
                (REGISTRY_KEY_FIELD.to_string(), json!(42)),
                (REGISTRY_SECRET_FIELD.to_string(), json!("secret")),
            ]),
        );
        let err = resolver(secrets).resolve("customers", "crm").await.unwrap_err();
        assert!(matches!(err, ContractError::Config { .. }));
        assert!(err.to_string().contains(REGISTRY_KEY_FIELD));
    }

    #[tokio::test]
    async fn unknown_subject_is_resolution_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/subjects/ghost/versions/latest")
            .with_status(404)
            .create_async()
            .await;

        let err = resolver(store(&server.url()))
            .resolve("ghost", "crm")
            .await
            .unwrap_err();
        match err {
            ContractError::Resolution { subject, .. } => assert_eq!(subject, "ghost"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
