//! Outcome reporters - quality-log side channel
//!
//! `HttpOutcomeReporter` posts one entry per delivery outcome:
//! - `POST {base}/LogSuccess` with `{resource, httpstatuscode, payload}`
//! - `POST {base}/LogException` with the same fields plus `exception`
//!
//! Reporter failures never affect delivery; the dispatcher only logs them.

use contracts::{
    ContractError, DecodedMessage, OutcomeReporter, SecretMap, require_str,
};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::oauth::{ClientCredentials, TokenSource};
use crate::sinks::rest::{CLIENT_ID_FIELD, CLIENT_SECRET_FIELD, TOKEN_ENDPOINT_FIELD};

const API_VERSION: &str = "1.0";
const REPORTER_NAME: &str = "quality-log";

/// Reporter that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReporter;

impl OutcomeReporter for NoReporter {
    async fn success(&self, _message: &DecodedMessage) -> Result<(), ContractError> {
        Ok(())
    }

    async fn failure(
        &self,
        _key: Option<&str>,
        _payload: Option<&str>,
        _error: &ContractError,
    ) -> Result<(), ContractError> {
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SuccessEntry<'a> {
    resource: &'a str,
    httpstatuscode: u16,
    payload: &'a str,
}

#[derive(Debug, Serialize)]
struct ExceptionEntry<'a> {
    resource: &'a str,
    httpstatuscode: u16,
    payload: &'a str,
    exception: String,
}

/// Status code reported for a failure
fn failure_status(error: &ContractError) -> u16 {
    match error {
        ContractError::Api { status, .. } => *status,
        ContractError::UnexpectedData { .. } | ContractError::DeserializationFailed { .. } => 422,
        _ => 500,
    }
}

/// Posts delivery outcomes to an HTTP quality-log API
pub struct HttpOutcomeReporter {
    base_url: String,
    resource: String,
    http: reqwest::Client,
    tokens: TokenSource,
}

impl HttpOutcomeReporter {
    /// Build from the reporter secret (`token-endpoint`, `client-id`, `client-secret`)
    pub fn from_secret(
        base_url: impl Into<String>,
        resource: impl Into<String>,
        secret: &SecretMap,
        path: &str,
    ) -> Result<Self, ContractError> {
        let credentials = ClientCredentials {
            token_url: require_str(secret, path, TOKEN_ENDPOINT_FIELD)?,
            client_id: require_str(secret, path, CLIENT_ID_FIELD)?,
            client_secret: require_str(secret, path, CLIENT_SECRET_FIELD)?,
        };
        Ok(Self::new(base_url, resource, credentials))
    }

    pub fn new(
        base_url: impl Into<String>,
        resource: impl Into<String>,
        credentials: ClientCredentials,
    ) -> Self {
        let http = reqwest::Client::new();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            resource: resource.into(),
            tokens: TokenSource::new(REPORTER_NAME, credentials, http.clone()),
            http,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    async fn post<T: Serialize>(&self, operation: &str, entry: &T) -> Result<(), ContractError> {
        let bearer = self.tokens.bearer().await?;
        let response = self
            .http
            .post(format!("{}/{operation}", self.base_url))
            .bearer_auth(bearer)
            .header("api-version", API_VERSION)
            .json(entry)
            .send()
            .await
            .map_err(|e| ContractError::sink_connection(REPORTER_NAME, e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ContractError::Api {
                sink_name: REPORTER_NAME.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        debug!(operation, "outcome reported");
        Ok(())
    }
}

impl OutcomeReporter for HttpOutcomeReporter {
    #[instrument(name = "reporter_success", skip(self, message), fields(key = %message.key))]
    async fn success(&self, message: &DecodedMessage) -> Result<(), ContractError> {
        let entry = SuccessEntry {
            resource: &self.resource,
            httpstatuscode: 200,
            payload: message.payload_str().unwrap_or_default(),
        };
        self.post("LogSuccess", &entry).await
    }

    #[instrument(name = "reporter_failure", skip_all, fields(key = ?key))]
    async fn failure(
        &self,
        key: Option<&str>,
        payload: Option<&str>,
        error: &ContractError,
    ) -> Result<(), ContractError> {
        let entry = ExceptionEntry {
            resource: &self.resource,
            httpstatuscode: failure_status(error),
            payload: payload.or(key).unwrap_or_default(),
            exception: error.to_string(),
        };
        self.post("LogException", &entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mockito::Matcher;
    use serde_json::json;

    async fn reporter(server: &mut mockito::Server) -> HttpOutcomeReporter {
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token":"tok","expires_in":3600}"#)
            .create_async()
            .await;
        HttpOutcomeReporter::new(
            format!("{}/api/", server.url()),
            "orders",
            ClientCredentials {
                token_url: format!("{}/token", server.url()),
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn success_posts_log_entry() {
        let mut server = mockito::Server::new_async().await;
        let reporter = reporter(&mut server).await;
        let mock = server
            .mock("POST", "/api/LogSuccess")
            .match_header("api-version", "1.0")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(json!({
                "resource": "orders",
                "httpstatuscode": 200,
                "payload": "{\"name\":\"Alice\"}"
            })))
            .with_status(200)
            .create_async()
            .await;

        let message = DecodedMessage {
            key: "42".to_string(),
            topic: "orders".to_string(),
            payload: Bytes::from_static(br#"{"name":"Alice"}"#),
        };
        reporter.success(&message).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failure_posts_exception_with_api_status() {
        let mut server = mockito::Server::new_async().await;
        let reporter = reporter(&mut server).await;
        let mock = server
            .mock("POST", "/api/LogException")
            .match_body(Matcher::PartialJson(json!({
                "resource": "orders",
                "httpstatuscode": 400,
                "payload": "{}"
            })))
            .with_status(200)
            .create_async()
            .await;

        let error = ContractError::Api {
            sink_name: "crm".to_string(),
            status: 400,
            body: "bad".to_string(),
        };
        reporter.failure(Some("42"), Some("{}"), &error).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_ok_status_is_error() {
        let mut server = mockito::Server::new_async().await;
        let reporter = reporter(&mut server).await;
        server
            .mock("POST", "/api/LogException")
            .with_status(201)
            .create_async()
            .await;

        let error = ContractError::DeserializationFailed { found: "string" };
        let result = reporter.failure(Some("42"), None, &error).await;
        assert!(matches!(result, Err(ContractError::Api { status: 201, .. })));
    }

    #[test]
    fn failure_status_by_error_kind() {
        assert_eq!(
            failure_status(&ContractError::DeserializationFailed { found: "number" }),
            422
        );
        assert_eq!(failure_status(&ContractError::transport("reset")), 500);
    }

    #[tokio::test]
    async fn no_reporter_accepts_everything() {
        let error = ContractError::transport("reset");
        assert!(NoReporter.failure(None, None, &error).await.is_ok());
    }
}
