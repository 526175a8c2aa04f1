//! plex.tv login tool
//!
//! Obtains (or reuses) an access token via the PIN flow and prints it to
//! stdout. The client identifier and token persist in the credential file,
//! so subsequent runs return immediately while the token stays valid.

use std::path::PathBuf;

use anyhow::{Context, Result};
use plex_auth::{DEFAULT_PRODUCT_NAME, DeviceAuthFlow};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr with LOG_LEVEL / RUST_LOG support; stdout carries
    // only the approval banner and the token
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // CLI: simple flag parsing
    let args: Vec<String> = std::env::args().collect();
    let auth_file = args
        .iter()
        .position(|a| a == "--auth-file")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);
    let product = args
        .iter()
        .position(|a| a == "--product")
        .and_then(|i| args.get(i + 1))
        .cloned()
        .unwrap_or_else(|| DEFAULT_PRODUCT_NAME.to_string());

    let flow = DeviceAuthFlow::new(&product, auth_file)
        .await
        .context("failed to initialize the authentication flow")?;
    info!(
        client_id = flow.client_id(),
        product = flow.product(),
        "starting plex.tv authentication"
    );

    let token = flow
        .get_access_token()
        .await
        .context("could not obtain a plex.tv access token")?;

    println!("{token}");
    Ok(())
}
