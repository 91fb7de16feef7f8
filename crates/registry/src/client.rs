//! HTTP client for the schema registry
//!
//! Speaks the Confluent-compatible REST API:
//! `GET {url}/subjects/{subject}/versions/latest` with HTTP basic auth.

use std::time::Duration;

use apache_avro::Schema;
use contracts::{EncodingDescriptor, EncodingKind};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{RegistryError, Result};

/// Registry connection parameters
#[derive(Debug, Clone)]
pub struct RegistryCredentials {
    /// Registry base URL
    pub url: String,
    /// Basic-auth user (API key)
    pub key: String,
    /// Basic-auth password (API secret)
    pub secret: String,
}

/// Schema document as returned by the registry
#[derive(Debug, Deserialize)]
struct SchemaResponse {
    #[serde(default)]
    subject: Option<String>,
    id: i32,
    version: i32,
    schema: String,
    #[serde(rename = "schemaType", default)]
    schema_type: Option<String>,
}

/// HTTP client for schema registry lookups
pub struct SchemaRegistryClient {
    credentials: RegistryCredentials,
    http_client: reqwest::Client,
}

impl SchemaRegistryClient {
    /// Create a client with the default request timeout
    pub fn new(credentials: RegistryCredentials) -> Result<Self> {
        Self::with_timeout(credentials, Duration::from_secs(10))
    }

    /// Create a client with an explicit request timeout
    pub fn with_timeout(credentials: RegistryCredentials, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::request_failed(&credentials.url, e.to_string()))?;

        Ok(Self {
            credentials,
            http_client,
        })
    }

    /// Fetch the latest schema registered under `subject`
    ///
    /// Avro schemas are parsed before returning so a broken schema is
    /// reported here rather than on the first record.
    #[instrument(
        name = "schema_registry_get_by_subject",
        skip(self),
        fields(subject = %subject)
    )]
    pub async fn get_by_subject(&self, subject: &str) -> Result<EncodingDescriptor> {
        let url = subject_url(&self.credentials.url, subject)?;

        let response = self
            .http_client
            .get(url.clone())
            .basic_auth(&self.credentials.key, Some(&self.credentials.secret))
            .send()
            .await
            .map_err(|e| RegistryError::request_failed(url.as_str(), e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(RegistryError::SubjectNotFound {
                    subject: subject.to_string(),
                })
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(RegistryError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
        }

        let body: SchemaResponse =
            response
                .json()
                .await
                .map_err(|e| RegistryError::InvalidResponse {
                    message: e.to_string(),
                })?;

        let descriptor = into_descriptor(subject, body)?;

        debug!(
            schema_id = descriptor.id,
            version = descriptor.version,
            kind = %descriptor.kind,
            "Schema retrieved"
        );

        Ok(descriptor)
    }
}

/// `{base}/subjects/{subject}/versions/latest`, with the subject as one
/// percent-encoded path segment
fn subject_url(base: &str, subject: &str) -> Result<Url> {
    let mut url =
        Url::parse(base).map_err(|e| RegistryError::request_failed(base, e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| RegistryError::request_failed(base, "registry url cannot be a base"))?
        .pop_if_empty()
        .extend(["subjects", subject, "versions", "latest"]);
    Ok(url)
}

fn into_descriptor(subject: &str, body: SchemaResponse) -> Result<EncodingDescriptor> {
    let kind = EncodingKind::from_registry(body.schema_type.as_deref()).ok_or_else(|| {
        RegistryError::UnknownSchemaType {
            schema_type: body.schema_type.clone().unwrap_or_default(),
        }
    })?;

    if kind == EncodingKind::Avro {
        Schema::parse_str(&body.schema).map_err(|e| RegistryError::InvalidSchema {
            message: e.to_string(),
        })?;
    }

    Ok(EncodingDescriptor {
        subject: body.subject.unwrap_or_else(|| subject.to_string()),
        id: body.id,
        version: body.version,
        kind,
        schema: body.schema,
    })
}
