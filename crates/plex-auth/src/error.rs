//! Error types for device-auth operations

/// Errors from device-auth operations.
///
/// Expected conditions (credential file absent, token rejected, PIN not yet
/// approved) are plain return values, not variants here; only states the
/// flow cannot recover from surface as errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("PIN creation failed: {0}")]
    PinCreate(String),

    #[error("authentication failed or timed out")]
    AuthenticationFailed,

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for device-auth operations.
pub type Result<T> = std::result::Result<T, Error>;
