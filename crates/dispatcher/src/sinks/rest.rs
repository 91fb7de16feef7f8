//! RestSink - OAuth2-authenticated upsert into a REST object endpoint
//!
//! Each message becomes one POST to
//! `{instance_url}{api_path}/sobjects/{object}/` with the body
//! `{"Key__c": key, "Topic__c": topic, "Value__c": base64(payload)}`.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use contracts::{ContractError, DecodedMessage, MessageSink, SecretMap, require_str};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::oauth::{ClientCredentials, TokenSource};

/// Secret field: OAuth2 token endpoint
pub const TOKEN_ENDPOINT_FIELD: &str = "token-endpoint";
/// Secret field: API version path, e.g. `/services/data/v56.0`
pub const API_URL_FIELD: &str = "api-url";
/// Secret field: OAuth2 client id
pub const CLIENT_ID_FIELD: &str = "client-id";
/// Secret field: OAuth2 client secret
pub const CLIENT_SECRET_FIELD: &str = "client-secret";

/// Configuration for RestSink
#[derive(Debug, Clone)]
pub struct RestSinkConfig {
    pub token_url: String,
    pub api_path: String,
    pub client_id: String,
    pub client_secret: String,
    /// Target object name
    pub object: String,
    /// Per-request timeout (None = no timeout)
    pub timeout: Option<Duration>,
}

impl RestSinkConfig {
    /// Read the connection config from the sink secret
    pub fn from_secret(
        secret: &SecretMap,
        path: &str,
        object: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ContractError> {
        Ok(Self {
            token_url: require_str(secret, path, TOKEN_ENDPOINT_FIELD)?,
            api_path: require_str(secret, path, API_URL_FIELD)?,
            client_id: require_str(secret, path, CLIENT_ID_FIELD)?,
            client_secret: require_str(secret, path, CLIENT_SECRET_FIELD)?,
            object: object.into(),
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        })
    }

    /// Upsert URL under the given instance host
    pub fn endpoint(&self, instance_url: &str) -> String {
        let mut url = instance_url.trim_end_matches('/').to_string();
        let api_path = self.api_path.trim_matches('/');
        if !api_path.is_empty() {
            url.push('/');
            url.push_str(api_path);
        }
        format!("{url}/sobjects/{}/", self.object.trim_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct UpsertBody<'a> {
    #[serde(rename = "Key__c")]
    key: &'a str,
    #[serde(rename = "Topic__c")]
    topic: &'a str,
    #[serde(rename = "Value__c")]
    value: String,
}

impl<'a> UpsertBody<'a> {
    fn from_message(message: &'a DecodedMessage) -> Self {
        Self {
            key: &message.key,
            topic: &message.topic,
            value: STANDARD.encode(&message.payload),
        }
    }
}

/// Sink that upserts messages into a REST API
pub struct RestSink {
    name: String,
    http: reqwest::Client,
    tokens: TokenSource,
    endpoint: String,
    delivered: u64,
}

impl RestSink {
    /// Authenticate and resolve the upsert endpoint
    ///
    /// Fails when the token endpoint rejects the credentials or does not
    /// return an `instance_url`.
    #[instrument(name = "rest_sink_connect", skip(config), fields(object = %config.object))]
    pub async fn connect(name: &str, config: RestSinkConfig) -> Result<Self, ContractError> {
        let name = name.to_string();
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ContractError::sink_connection(&name, e.to_string()))?;

        let tokens = TokenSource::new(
            name.clone(),
            ClientCredentials {
                token_url: config.token_url.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
            },
            http.clone(),
        );

        let token = tokens.fetch().await?;
        let instance_url = token.instance_url.ok_or_else(|| {
            ContractError::sink_connection(&name, "token response carries no instance_url")
        })?;
        let endpoint = config.endpoint(&instance_url);
        info!(sink = %name, endpoint = %endpoint, "RestSink connected");

        Ok(Self {
            name,
            http,
            tokens,
            endpoint,
            delivered: 0,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

impl MessageSink for RestSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "rest_sink_upsert",
        skip(self, message),
        fields(sink = %self.name, key = %message.key)
    )]
    async fn upsert(&mut self, message: &DecodedMessage) -> Result<(), ContractError> {
        let bearer = self.tokens.bearer().await?;
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(bearer)
            .json(&UpsertBody::from_message(message))
            .send()
            .await
            .map_err(|e| ContractError::sink_connection(&self.name, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                // Expired or revoked token
                self.tokens.invalidate().await;
            }
            let body = response.text().await.unwrap_or_default();
            return Err(ContractError::Api {
                sink_name: self.name.clone(),
                status: status.as_u16(),
                body,
            });
        }

        self.delivered += 1;
        debug!(status = status.as_u16(), "upsert accepted");
        Ok(())
    }

    #[instrument(name = "rest_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, delivered = self.delivered, "RestSink closed");
        Ok(())
    }
}
