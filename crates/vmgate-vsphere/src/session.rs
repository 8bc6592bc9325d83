//! Session acquisition.
//!
//! One authenticated POST per call. The token is handed to the caller and
//! forgotten; there is no cache and no refresh.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use crate::client::{SESSION_PATH, VsphereClient};
use crate::error::{VsphereError, VsphereResult};
use crate::types::SessionToken;

const OPERATION: &str = "acquire_session";

/// Source of control-plane session tokens.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Obtain a fresh token. Exactly one attempt; never retried.
    async fn acquire_session(&self) -> VsphereResult<SessionToken>;
}

#[async_trait]
impl SessionProvider for VsphereClient {
    async fn acquire_session(&self) -> VsphereResult<SessionToken> {
        let config = self.config();
        let url = config.endpoint(SESSION_PATH);
        let http = self.http(OPERATION)?;

        let result = async {
            let response = http
                .post(&url)
                .basic_auth(&config.username, Some(&config.password))
                .send()
                .await
                .map_err(|e| VsphereError::from_reqwest(OPERATION, e))?;

            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| VsphereError::from_reqwest(OPERATION, e))?;

            if !status.is_success() {
                return Err(VsphereError::rejected(OPERATION, status, &body));
            }
            parse_session_token(&body)
        }
        .await;

        match &result {
            Ok(_) => debug!(target_system = "vsphere", operation = OPERATION, "session acquired"),
            Err(e) => error!(
                target_system = "vsphere",
                operation = OPERATION,
                %url,
                error = %e,
                "session acquisition failed"
            ),
        }
        result
    }
}

/// Extract the token from a session response body (`{"value": "..."}`).
pub fn parse_session_token(body: &[u8]) -> VsphereResult<SessionToken> {
    let json: Value = serde_json::from_slice(body).map_err(|e| {
        VsphereError::protocol(OPERATION, format!("session response is not JSON: {e}"))
    })?;

    match json.get("value").and_then(Value::as_str) {
        Some(token) if !token.is_empty() => Ok(SessionToken::new(token)),
        _ => Err(VsphereError::protocol(OPERATION, "session token missing")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VsphereConfig;
    use serde_json::json;
    use wiremock::matchers::{basic_auth, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> VsphereClient {
        VsphereClient::new(VsphereConfig::new(&server.uri(), "operator@vsphere.local", "pw"))
    }

    #[test]
    fn parse_token_present() {
        let token = parse_session_token(br#"{"value":"abc"}"#).unwrap();
        assert_eq!(token.as_str(), "abc");
    }

    #[test]
    fn parse_token_missing_is_protocol_error() {
        let err = parse_session_token(br#"{"other":"abc"}"#).unwrap_err();
        assert!(matches!(
            err,
            VsphereError::Protocol { ref message, .. } if message == "session token missing"
        ));

        let err = parse_session_token(br#"{"value":""}"#).unwrap_err();
        assert!(matches!(err, VsphereError::Protocol { .. }));
    }

    #[test]
    fn parse_token_not_json_is_protocol_error() {
        let err = parse_session_token(b"<html>").unwrap_err();
        assert!(matches!(err, VsphereError::Protocol { .. }));
    }

    #[tokio::test]
    async fn acquires_token_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SESSION_PATH))
            .and(basic_auth("operator@vsphere.local", "pw"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": "tok-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let token = client_for(&server).acquire_session().await.unwrap();
        assert_eq!(token.as_str(), "tok-1");
    }

    #[tokio::test]
    async fn bad_credentials_are_rejected_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SESSION_PATH))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"type": "com.vmware.vapi.std.errors.unauthenticated"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).acquire_session().await.unwrap_err();
        match err {
            VsphereError::UpstreamRejected { status, .. } => assert_eq!(status, 401),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_token_field_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SESSION_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let err = client_for(&server).acquire_session().await.unwrap_err();
        assert!(matches!(err, VsphereError::Protocol { .. }));
    }

    #[tokio::test]
    async fn connection_refused_is_unavailable() {
        // Nothing listens on port 1.
        let client = VsphereClient::new(VsphereConfig::new("http://127.0.0.1:1", "u", "p"));
        let err = client.acquire_session().await.unwrap_err();
        assert!(matches!(err, VsphereError::UpstreamUnavailable { .. }), "got {err:?}");
    }
}
