//! plex.tv device-auth constants
//!
//! Public client configuration for the plex.tv PIN flow. These values are
//! not secrets — they identify the product and the wire protocol. The actual
//! secret (the access token) lives in the credential store.

use std::time::Duration;

/// plex.tv v2 API base URL (PIN and user endpoints)
pub const PLEX_API_URL: &str = "https://plex.tv/api/v2";

/// Hosted approval page the operator opens to enter/confirm the PIN
pub const PLEX_AUTH_APP_URL: &str = "https://app.plex.tv/auth";

/// Product name sent with every request and shown on the approval page
pub const DEFAULT_PRODUCT_NAME: &str = "Plex Media Server Prometheus Exporter";

/// Environment variable overriding the credential file path
pub const AUTH_FILE_ENV: &str = "PLEX_AUTH_FILE";

/// Default credential file name under the user's home directory
pub const DEFAULT_AUTH_FILE_NAME: &str = ".plex_exporter_auth";

/// Header carrying the product name
pub const HEADER_PRODUCT: &str = "X-Plex-Product";

/// Header carrying the durable client identifier
pub const HEADER_CLIENT_ID: &str = "X-Plex-Client-Identifier";

/// Header carrying the access token on authenticated calls
pub const HEADER_TOKEN: &str = "X-Plex-Token";

/// Delay between PIN status checks
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Overall deadline for the operator to approve the PIN
pub const POLL_TIMEOUT: Duration = Duration::from_secs(300);

/// Per-request timeout, so one hung call cannot absorb the poll deadline
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect-phase timeout for each request
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
