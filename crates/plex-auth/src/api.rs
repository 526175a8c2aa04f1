//! HTTP client for the plex.tv PIN and user endpoints
//!
//! Three calls back the flow: create a PIN, poll its status, verify a stored
//! token. Every request carries `accept: application/json` and the client
//! identifier; the PIN-creation and verification calls also carry the
//! product name. TLS verification uses the default (system) trust store.
//!
//! Each request has its own bounded timeout, so a single hung call cannot
//! absorb the flow's overall polling deadline.

use serde::Deserialize;
use tracing::debug;

use crate::constants::{
    CONNECT_TIMEOUT, HEADER_CLIENT_ID, HEADER_PRODUCT, HEADER_TOKEN, PLEX_API_URL, REQUEST_TIMEOUT,
};
use crate::error::{Error, Result};

/// A server-issued PIN pair.
///
/// Ephemeral: created at the start of one authorization attempt, valid until
/// the server-side expiry or until exchanged for a token. Never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct Pin {
    pub id: u64,
    pub code: String,
}

/// Poll response. `authToken` appears once the operator approves the PIN.
#[derive(Debug, Deserialize)]
struct PinStatus {
    #[serde(rename = "authToken")]
    auth_token: Option<String>,
}

/// Client for the plex.tv device-auth endpoints.
pub struct AuthClient {
    http: reqwest::Client,
    api_url: String,
    product: String,
    client_id: String,
}

impl AuthClient {
    /// Create a client against the production plex.tv API.
    pub fn new(product: &str, client_id: &str) -> Result<Self> {
        Self::with_api_url(product, client_id, PLEX_API_URL)
    }

    /// Create a client against an explicit base URL (tests point this at a
    /// local mock server).
    pub fn with_api_url(product: &str, client_id: &str, api_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Http(format!("building HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            product: product.to_string(),
            client_id: client_id.to_string(),
        })
    }

    /// Register a new one-time PIN.
    ///
    /// Requests a strong (longer, less guessable) code. Any transport
    /// failure or non-success status is fatal to the authorization attempt.
    pub async fn create_pin(&self) -> Result<Pin> {
        let response = self
            .http
            .post(format!("{}/pins", self.api_url))
            .query(&[("strong", "true")])
            .header("accept", "application/json")
            .header(HEADER_PRODUCT, &self.product)
            .header(HEADER_CLIENT_ID, &self.client_id)
            .send()
            .await
            .map_err(|e| Error::PinCreate(format!("pin request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(Error::PinCreate(format!(
                "pin endpoint returned {status}: {body}"
            )));
        }

        response
            .json::<Pin>()
            .await
            .map_err(|e| Error::PinCreate(format!("invalid pin response: {e}")))
    }

    /// Check whether the operator has approved the PIN yet.
    ///
    /// `Ok(Some(token))` once approved; `Ok(None)` while pending. A
    /// non-success status also counts as pending — the server keeps
    /// answering with error bodies until the PIN is approved or expires,
    /// and the flow's deadline bounds how long we keep asking.
    pub async fn poll_pin(&self, pin: &Pin) -> Result<Option<String>> {
        let response = self
            .http
            .get(format!("{}/pins/{}", self.api_url, pin.id))
            .query(&[("code", pin.code.as_str())])
            .header("accept", "application/json")
            .header(HEADER_CLIENT_ID, &self.client_id)
            .send()
            .await
            .map_err(|e| Error::Http(format!("pin status request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            debug!(pin_id = pin.id, %status, "pin status not available yet");
            return Ok(None);
        }

        let pin_status = response
            .json::<PinStatus>()
            .await
            .map_err(|e| Error::Http(format!("invalid pin status response: {e}")))?;
        Ok(pin_status.auth_token)
    }

    /// Whether plex.tv still accepts the token.
    ///
    /// Any transport error or non-success status means "invalid" — the
    /// caller falls through to a fresh authorization either way.
    pub async fn verify_token(&self, token: &str) -> bool {
        let response = self
            .http
            .get(format!("{}/user", self.api_url))
            .header("accept", "application/json")
            .header(HEADER_PRODUCT, &self.product)
            .header(HEADER_CLIENT_ID, &self.client_id)
            .header(HEADER_TOKEN, token)
            .send()
            .await;

        match response {
            Ok(r) => r.status().is_success(),
            Err(e) => {
                debug!(error = %e, "token verification request failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> AuthClient {
        AuthClient::with_api_url("Test Product", "cid-test", &server.uri()).unwrap()
    }

    #[tokio::test]
    async fn create_pin_sends_identity_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pins"))
            .and(query_param("strong", "true"))
            .and(header("accept", "application/json"))
            .and(header(HEADER_PRODUCT, "Test Product"))
            .and(header(HEADER_CLIENT_ID, "cid-test"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"id": 4242, "code": "QXF3ZK"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let pin = client(&server).create_pin().await.unwrap();
        assert_eq!(pin.id, 4242);
        assert_eq!(pin.code, "QXF3ZK");
    }

    #[tokio::test]
    async fn create_pin_propagates_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pins"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream broke"))
            .mount(&server)
            .await;

        let err = client(&server).create_pin().await.unwrap_err();
        assert!(matches!(err, Error::PinCreate(_)), "got {err:?}");
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn create_pin_rejects_unreachable_server() {
        // Nothing listens on port 1, so the request fails at connect time
        let api = AuthClient::with_api_url("Test Product", "cid-test", "http://127.0.0.1:1").unwrap();
        let err = api.create_pin().await.unwrap_err();
        assert!(matches!(err, Error::PinCreate(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn poll_pin_pending_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pins/7"))
            .and(query_param("code", "ABCD"))
            .and(header(HEADER_CLIENT_ID, "cid-test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": 7, "code": "ABCD"})),
            )
            .mount(&server)
            .await;

        let pin = Pin {
            id: 7,
            code: "ABCD".into(),
        };
        let token = client(&server).poll_pin(&pin).await.unwrap();
        assert!(token.is_none());
    }

    #[tokio::test]
    async fn poll_pin_returns_token_when_approved() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pins/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"id": 7, "code": "ABCD", "authToken": "tok_approved"}),
            ))
            .mount(&server)
            .await;

        let pin = Pin {
            id: 7,
            code: "ABCD".into(),
        };
        let token = client(&server).poll_pin(&pin).await.unwrap();
        assert_eq!(token.as_deref(), Some("tok_approved"));
    }

    #[tokio::test]
    async fn poll_pin_non_success_is_pending() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pins/7"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"errors": [{"code": 1020}]})),
            )
            .mount(&server)
            .await;

        let pin = Pin {
            id: 7,
            code: "ABCD".into(),
        };
        let token = client(&server).poll_pin(&pin).await.unwrap();
        assert!(token.is_none());
    }

    #[tokio::test]
    async fn poll_pin_transport_error_propagates() {
        let api = AuthClient::with_api_url("Test Product", "cid-test", "http://127.0.0.1:1").unwrap();
        let pin = Pin {
            id: 7,
            code: "ABCD".into(),
        };
        let err = api.poll_pin(&pin).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn verify_token_sends_token_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("accept", "application/json"))
            .and(header(HEADER_PRODUCT, "Test Product"))
            .and(header(HEADER_CLIENT_ID, "cid-test"))
            .and(header(HEADER_TOKEN, "tok_stored"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"username": "someone"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        assert!(client(&server).verify_token("tok_stored").await);
    }

    #[tokio::test]
    async fn verify_token_false_on_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        assert!(!client(&server).verify_token("tok_expired").await);
    }

    #[tokio::test]
    async fn verify_token_false_on_transport_error() {
        let api = AuthClient::with_api_url("Test Product", "cid-test", "http://127.0.0.1:1").unwrap();
        assert!(!api.verify_token("tok_any").await);
    }
}
