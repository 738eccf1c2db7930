//! Ephemeral credentials from the token endpoint.
//!
//! The endpoint is a plain HTTP service that mints a short-lived token and
//! hands back everything needed to open the live socket. Only the response
//! shape matters here; how the endpoint builds it does not.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;
use zeroize::Zeroize;

use super::base::{SessionError, SessionResult};

/// Default token endpoint
pub const DEFAULT_TOKEN_ENDPOINT: &str = "http://localhost:8080/token";

/// Default request timeout (seconds)
pub const DEFAULT_TOKEN_TIMEOUT_SECONDS: u64 = 10;

/// Response of the token endpoint.
///
/// Credential fields are wiped from memory on drop.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub ws_url: Option<String>,
    #[serde(default)]
    pub setup: Option<Value>,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub new_session_expire_time: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("token", &self.access_token().map(|_| "[REDACTED]"))
            .field("ws_url", &self.ws_url)
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Drop for TokenResponse {
    fn drop(&mut self) {
        for secret in [&mut self.token, &mut self.name, &mut self.auth_token] {
            if let Some(value) = secret.as_mut() {
                value.zeroize();
            }
        }
    }
}

impl TokenResponse {
    /// First non-empty of `token`, `name`, `authToken`
    pub fn access_token(&self) -> Option<&str> {
        [&self.token, &self.name, &self.auth_token]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|value| !value.is_empty())
    }

    /// Session configuration to send as `setup`: `setup`, else `config`,
    /// else an empty object
    pub fn setup_payload(&self) -> Value {
        self.setup
            .clone()
            .filter(|v| !v.is_null())
            .or_else(|| self.config.clone().filter(|v| !v.is_null()))
            .unwrap_or_else(|| Value::Object(Default::default()))
    }

    /// Socket endpoint issued with the token, or `default`
    pub fn endpoint<'a>(&'a self, default: &'a str) -> &'a str {
        self.ws_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(default)
    }
}

/// Append `access_token=<urlencoded token>` to the socket endpoint.
pub fn build_socket_url(endpoint: &str, token: &str) -> SessionResult<String> {
    if token.is_empty() {
        return Err(SessionError::InvalidCredential(
            "no access token in credential response".to_string(),
        ));
    }

    let parsed = Url::parse(endpoint).map_err(|e| {
        SessionError::InvalidCredential(format!("invalid socket endpoint '{}': {}", endpoint, e))
    })?;
    if !matches!(parsed.scheme(), "ws" | "wss") {
        return Err(SessionError::InvalidCredential(format!(
            "socket endpoint must use ws or wss, got '{}'",
            parsed.scheme()
        )));
    }

    let separator = if endpoint.contains('?') { '&' } else { '?' };
    Ok(format!(
        "{}{}access_token={}",
        endpoint,
        separator,
        urlencoding::encode(token)
    ))
}

/// Endpoint URL with the query removed, for logging.
pub fn redact_url(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Issues credentials for a new session.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn fetch(&self) -> SessionResult<TokenResponse>;
}

/// Token endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenEndpointConfig {
    /// Endpoint URL
    pub url: String,
    /// JSON body sent with every request
    pub overrides: Value,
    /// Request timeout (seconds)
    pub timeout_seconds: u64,
}

impl Default for TokenEndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_TOKEN_ENDPOINT.to_string(),
            overrides: Value::Object(Default::default()),
            timeout_seconds: DEFAULT_TOKEN_TIMEOUT_SECONDS,
        }
    }
}

/// [`CredentialProvider`] backed by an HTTP token endpoint.
#[derive(Debug, Clone)]
pub struct TokenEndpointClient {
    http: reqwest::Client,
    config: TokenEndpointConfig,
}

impl TokenEndpointClient {
    pub fn new(config: TokenEndpointConfig) -> SessionResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SessionError::CredentialFetch(format!("HTTP client error: {}", e)))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &TokenEndpointConfig {
        &self.config
    }
}

#[async_trait]
impl CredentialProvider for TokenEndpointClient {
    async fn fetch(&self) -> SessionResult<TokenResponse> {
        debug!(endpoint = %self.config.url, "Requesting session credential");

        let response = self
            .http
            .post(&self.config.url)
            .json(&self.config.overrides)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SessionError::Timeout(format!("token request to {}", self.config.url))
                } else {
                    SessionError::CredentialFetch(format!("Token request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::CredentialFetch(format!(
                "Token request failed: {} {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            SessionError::InvalidCredential(format!("malformed credential response: {}", e))
        })?;

        info!(
            model = token.model.as_deref().unwrap_or("-"),
            voice = token.voice.as_deref().unwrap_or("-"),
            expires_at = token.expires_at.as_deref().unwrap_or("-"),
            "Session credential issued"
        );
        Ok(token)
    }
}
