//! Token endpoint client against a mock HTTP server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use duplex_voice::core::session::{
    CredentialProvider, SessionError, TokenEndpointClient, TokenEndpointConfig,
};

fn client(server: &MockServer, overrides: serde_json::Value, timeout_seconds: u64) -> TokenEndpointClient {
    TokenEndpointClient::new(TokenEndpointConfig {
        url: format!("{}/token", server.uri()),
        overrides,
        timeout_seconds,
    })
    .unwrap()
}

#[tokio::test]
async fn test_posts_overrides_and_parses_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_json(json!({"model": "models/custom", "voice": "Puck"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "auth_tokens/abc",
            "wsUrl": "wss://live.example.test/ws",
            "setup": {"model": "models/custom"},
            "model": "models/custom",
            "voice": "Puck",
            "expiresAt": "2030-01-01T00:00:00Z",
            "newSessionExpireTime": "2030-01-01T00:01:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = client(&server, json!({"model": "models/custom", "voice": "Puck"}), 5)
        .fetch()
        .await
        .unwrap();

    assert_eq!(token.access_token(), Some("auth_tokens/abc"));
    assert_eq!(token.endpoint("wss://default"), "wss://live.example.test/ws");
    assert_eq!(token.setup_payload(), json!({"model": "models/custom"}));
    assert_eq!(token.voice.as_deref(), Some("Puck"));
    assert_eq!(token.expires_at.as_deref(), Some("2030-01-01T00:00:00Z"));
    assert_eq!(
        token.new_session_expire_time.as_deref(),
        Some("2030-01-01T00:01:00Z")
    );
}

#[tokio::test]
async fn test_empty_overrides_send_empty_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "auth_tokens/n"})))
        .expect(1)
        .mount(&server)
        .await;

    let token = client(&server, json!({}), 5).fetch().await.unwrap();
    assert_eq!(token.access_token(), Some("auth_tokens/n"));
    assert_eq!(token.setup_payload(), json!({}));
}

#[tokio::test]
async fn test_error_status_includes_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = client(&server, json!({}), 5).fetch().await;
    assert_eq!(
        result.unwrap_err(),
        SessionError::CredentialFetch("Token request failed: 500 boom".to_string())
    );
}

#[tokio::test]
async fn test_malformed_body_is_invalid_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let result = client(&server, json!({}), 5).fetch().await;
    assert!(matches!(result, Err(SessionError::InvalidCredential(_))));
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": "late"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let result = client(&server, json!({}), 1).fetch().await;
    assert!(matches!(result, Err(SessionError::Timeout(_))));
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    let client = TokenEndpointClient::new(TokenEndpointConfig {
        url: "http://127.0.0.1:1/token".to_string(),
        ..Default::default()
    })
    .unwrap();

    match client.fetch().await {
        Err(SessionError::CredentialFetch(message)) => {
            assert!(message.starts_with("Token request failed:"))
        }
        other => panic!("unexpected {:?}", other.map(|_| ())),
    }
}
