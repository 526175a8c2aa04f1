//! plex.tv PIN device-authorization library
//!
//! Obtains and persists a plex.tv access token for a single local client.
//! This crate is a standalone library with no dependency on the login
//! binary — it can be tested and used independently.
//!
//! Credential flow:
//! 1. `DeviceAuthFlow::new()` loads the durable client identifier from the
//!    credential file, or generates and persists a fresh one
//! 2. `get_access_token()` returns the stored token if plex.tv still
//!    accepts it (`AuthClient::verify_token`)
//! 3. Otherwise `AuthClient::create_pin()` registers a one-time PIN
//! 4. The operator approves it via the printed app.plex.tv URL
//! 5. The flow polls the PIN status once per second until approved or the
//!    deadline passes
//! 6. The approved token is merged into the `CredentialStore` for later runs

pub mod api;
pub mod constants;
pub mod error;
pub mod flow;
pub mod store;

pub use api::{AuthClient, Pin};
pub use constants::*;
pub use error::{Error, Result};
pub use flow::DeviceAuthFlow;
pub use store::{CredentialStore, Record};
