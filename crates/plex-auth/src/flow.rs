//! PIN authorization flow
//!
//! Orchestrates token acquisition end to end: reuse the stored token when
//! plex.tv still accepts it, otherwise register a PIN, hand the approval URL
//! to the operator, and poll until the PIN is approved or the deadline
//! passes. The approved token is merged into the credential store for the
//! next run.
//!
//! Construction also performs the identity bootstrap: the durable client
//! identifier is loaded from the store or generated and persisted
//! immediately, so a crash before the first successful authorization does
//! not change the identity seen by plex.tv on the next run.

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::{AuthClient, Pin};
use crate::constants::{PLEX_API_URL, PLEX_AUTH_APP_URL, POLL_INTERVAL, POLL_TIMEOUT};
use crate::error::{Error, Result};
use crate::store::{CredentialStore, Record};

/// Device-authorization flow against plex.tv.
pub struct DeviceAuthFlow {
    store: CredentialStore,
    api: AuthClient,
    product: String,
    client_id: String,
    auth_app_url: String,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl DeviceAuthFlow {
    /// Create a flow for the given product.
    ///
    /// `auth_file` overrides the credential file location; see
    /// [`CredentialStore::resolve`] for the fallback chain.
    pub async fn new(product: &str, auth_file: Option<PathBuf>) -> Result<Self> {
        let store = CredentialStore::resolve(auth_file);
        Self::with_endpoints(product, store, PLEX_API_URL, PLEX_AUTH_APP_URL).await
    }

    /// Create a flow with an injected store and endpoint overrides (tests
    /// point these at a mock server and a temp directory).
    pub async fn with_endpoints(
        product: &str,
        store: CredentialStore,
        api_url: &str,
        auth_app_url: &str,
    ) -> Result<Self> {
        let client_id = bootstrap_client_id(&store).await?;
        let api = AuthClient::with_api_url(product, &client_id, api_url)?;
        Ok(Self {
            store,
            api,
            product: product.to_string(),
            client_id,
            auth_app_url: auth_app_url.trim_end_matches('/').to_string(),
            poll_interval: POLL_INTERVAL,
            poll_timeout: POLL_TIMEOUT,
        })
    }

    /// Override the polling cadence and deadline.
    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }

    /// The durable client identifier for this installation.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The product name sent to plex.tv.
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Get a valid access token, running the PIN flow if needed.
    ///
    /// A stored token that the server still accepts is returned as-is with
    /// no writes. Otherwise the operator is prompted with the approval URL
    /// and the approved token is persisted before being returned.
    pub async fn get_access_token(&self) -> Result<String> {
        let record = self.store.load().await;
        if let Some(token) = record.access_token {
            if self.api.verify_token(&token).await {
                info!("using stored access token");
                return Ok(token);
            }
            info!("stored token no longer valid, starting authentication flow");
        } else {
            info!("no stored token, starting authentication flow");
        }
        self.authenticate().await
    }

    async fn authenticate(&self) -> Result<String> {
        let pin = self.api.create_pin().await?;
        debug!(pin_id = pin.id, "registered authorization pin");

        let url = self.approval_url(&pin.code);
        self.present_approval_url(&url);

        match self.poll_for_token(&pin).await {
            Some(token) => {
                self.store
                    .save(&Record {
                        client_id: None,
                        access_token: Some(token.clone()),
                    })
                    .await?;
                info!("authentication successful");
                Ok(token)
            }
            None => Err(Error::AuthenticationFailed),
        }
    }

    /// Approval URL the operator opens in a browser.
    ///
    /// plex.tv expects the parameters after a `#?` fragment marker; keys are
    /// literal (including the bracketed context key), values are
    /// percent-encoded.
    fn approval_url(&self, pin_code: &str) -> String {
        format!(
            "{}#?clientID={}&code={}&context[device][product]={}",
            self.auth_app_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(pin_code),
            urlencoding::encode(&self.product),
        )
    }

    fn present_approval_url(&self, url: &str) {
        let rule = "=".repeat(80);
        println!("\n{rule}");
        println!("PLEX AUTHENTICATION REQUIRED");
        println!("{rule}");
        println!("\nPlease visit this URL to authenticate:");
        println!("\n  {url}\n");
        println!("Waiting for authentication...");
        println!("{rule}\n");
    }

    /// Poll the PIN until approved, the deadline passes, or a request fails.
    ///
    /// The deadline is computed once at loop entry so the cadence cannot
    /// drift it. A transport error ends the loop — the PIN may have expired
    /// server-side, and the caller decides whether to start over.
    async fn poll_for_token(&self, pin: &Pin) -> Option<String> {
        let deadline = Instant::now() + self.poll_timeout;
        loop {
            if Instant::now() >= deadline {
                warn!(
                    timeout_secs = self.poll_timeout.as_secs(),
                    "authentication timed out"
                );
                return None;
            }

            match self.api.poll_pin(pin).await {
                Ok(Some(token)) => return Some(token),
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "error polling for token");
                    return None;
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Load the stored client identifier, or generate and persist a new one.
///
/// Persisting happens at construction, before any authorization, so a crash
/// mid-flow cannot change the identity plex.tv sees on the next run.
async fn bootstrap_client_id(store: &CredentialStore) -> Result<String> {
    let record = store.load().await;
    if let Some(id) = record.client_id {
        debug!("reusing stored client identifier");
        return Ok(id);
    }

    let id = uuid::Uuid::new_v4().to_string();
    store
        .save(&Record {
            client_id: Some(id.clone()),
            access_token: None,
        })
        .await?;
    info!("generated new client identifier");
    Ok(id)
}
