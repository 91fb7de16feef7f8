//! OAuth2 client-credentials token source
//!
//! Credentials are sent in the form body (`client_id` / `client_secret`).
//! The token is cached until shortly before `expires_in` elapses.

use std::time::{Duration, Instant};

use contracts::ContractError;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Refresh margin before the advertised expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Client-credentials grant parameters
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// API host assigned to this tenant (REST sinks only)
    #[serde(default)]
    pub instance_url: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at.is_none_or(|at| Instant::now() < at)
    }
}

/// Fetches and caches bearer tokens
#[derive(Debug)]
pub struct TokenSource {
    owner: String,
    credentials: ClientCredentials,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    /// `owner` names the sink or reporter in errors
    pub fn new(
        owner: impl Into<String>,
        credentials: ClientCredentials,
        http: reqwest::Client,
    ) -> Self {
        Self {
            owner: owner.into(),
            credentials,
            http,
            cached: Mutex::new(None),
        }
    }

    /// Request a new token, replacing the cached one
    #[instrument(name = "oauth_fetch", skip(self), fields(owner = %self.owner))]
    pub async fn fetch(&self) -> Result<TokenResponse, ContractError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.credentials.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                ContractError::sink_connection(&self.owner, format!("token request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ContractError::Api {
                sink_name: format!("{} token endpoint", self.owner),
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ContractError::sink_connection(&self.owner, format!("invalid token response: {e}"))
        })?;

        let expires_at = token
            .expires_in
            .map(|secs| Instant::now() + Duration::from_secs(secs).saturating_sub(EXPIRY_MARGIN));
        *self.cached.lock().await = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at,
        });
        debug!(expires_in = ?token.expires_in, "access token acquired");

        Ok(token)
    }

    /// Current bearer token, fetching a new one when missing or expired
    pub async fn bearer(&self) -> Result<String, ContractError> {
        {
            let cached = self.cached.lock().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
                return Ok(token.value.clone());
            }
        }
        Ok(self.fetch().await?.access_token)
    }

    /// Drop the cached token so the next call fetches a new one
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn source(url: &str) -> TokenSource {
        TokenSource::new(
            "test",
            ClientCredentials {
                token_url: format!("{url}/oauth2/token"),
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
            },
            reqwest::Client::new(),
        )
    }

    #[tokio::test]
    async fn fetch_posts_credentials_in_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "id".into()),
                Matcher::UrlEncoded("client_secret".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"tok","instance_url":"https://tenant.example"}"#)
            .create_async()
            .await;

        let token = source(&server.url()).fetch().await.unwrap();
        assert_eq!(token.access_token, "tok");
        assert_eq!(token.instance_url.as_deref(), Some("https://tenant.example"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn bearer_reuses_cached_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(r#"{"access_token":"tok","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let tokens = source(&server.url());
        assert_eq!(tokens.bearer().await.unwrap(), "tok");
        assert_eq!(tokens.bearer().await.unwrap(), "tok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(r#"{"access_token":"tok"}"#)
            .expect(2)
            .create_async()
            .await;

        let tokens = source(&server.url());
        tokens.bearer().await.unwrap();
        tokens.invalidate().await;
        tokens.bearer().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_credentials_are_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth2/token")
            .with_status(401)
            .with_body("invalid_client")
            .create_async()
            .await;

        let err = source(&server.url()).fetch().await.unwrap_err();
        match err {
            ContractError::Api { status, body, .. } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid_client");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
