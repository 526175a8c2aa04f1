//! Credential persistence for the device-auth flow
//!
//! A single JSON file holds the durable client identifier and the most
//! recent access token. All writes use atomic temp-file + rename to prevent
//! corruption on crash, and every save re-reads the file and merges, so a
//! partial update never drops a previously written `client_id`.
//!
//! A missing or unparseable file is a normal "no credentials yet" state:
//! `load` degrades to an empty record instead of erroring, and the flow
//! bootstraps a fresh identity.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::{AUTH_FILE_ENV, DEFAULT_AUTH_FILE_NAME};
use crate::error::{Error, Result};

/// The persisted credential record.
///
/// `client_id` is write-once: it names this installation to plex.tv and is
/// never replaced while the file exists. `access_token` is replaced by each
/// successful authorization. Absent fields are omitted from the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Why a load produced no record.
///
/// The public contract collapses all of these to an empty record; keeping
/// them distinct internally preserves diagnosability in the logs.
#[derive(Debug)]
enum LoadFailure {
    Missing,
    Unreadable(std::io::Error),
    Malformed(serde_json::Error),
}

/// File-backed credential store.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Create a store backed by the given file path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Resolve the backing file path.
    ///
    /// Precedence: explicit path > `PLEX_AUTH_FILE` env var > a fixed
    /// default under the user's home directory.
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        if let Some(path) = explicit {
            return Self::new(path);
        }
        if let Ok(path) = std::env::var(AUTH_FILE_ENV) {
            return Self::new(PathBuf::from(path));
        }
        let path = directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().join(DEFAULT_AUTH_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_AUTH_FILE_NAME));
        Self::new(path)
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored record.
    ///
    /// Never errors: a missing, unreadable, or malformed file yields an
    /// empty record so the caller can proceed as a first run.
    pub async fn load(&self) -> Record {
        match self.try_load().await {
            Ok(record) => record,
            Err(LoadFailure::Missing) => {
                debug!(path = %self.path.display(), "credential file not found");
                Record::default()
            }
            Err(LoadFailure::Unreadable(e)) => {
                warn!(path = %self.path.display(), error = %e, "credential file unreadable, treating as absent");
                Record::default()
            }
            Err(LoadFailure::Malformed(e)) => {
                warn!(path = %self.path.display(), error = %e, "credential file malformed, treating as absent");
                Record::default()
            }
        }
    }

    async fn try_load(&self) -> std::result::Result<Record, LoadFailure> {
        if !self.path.exists() {
            return Err(LoadFailure::Missing);
        }
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(LoadFailure::Unreadable)?;
        serde_json::from_str(&contents).map_err(LoadFailure::Malformed)
    }

    /// Merge the given record into the file and persist it.
    ///
    /// The existing file is re-read first: a stored `client_id` always wins
    /// over the incoming one, and an incoming `access_token` replaces the
    /// stored one. Returns the merged record as written.
    pub async fn save(&self, record: &Record) -> Result<Record> {
        let existing = self.load().await;
        let merged = Record {
            client_id: existing.client_id.or_else(|| record.client_id.clone()),
            access_token: record.access_token.clone().or(existing.access_token),
        };
        write_atomic(&self.path, &merged).await?;
        Ok(merged)
    }
}

/// Write the record to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Missing parent directories are created. The file is set to
/// 0600 (owner read/write only) since it contains the access token.
async fn write_atomic(path: &Path, record: &Record) -> Result<()> {
    let json = serde_json::to_string_pretty(record)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::Io(format!("creating credential directory: {e}")))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Io("credential path has no file name".into()))?;
    let tmp_path = dir.join(format!(
        ".{}.tmp.{}",
        file_name.to_string_lossy(),
        std::process::id()
    ));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    // Set 0600 permissions (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}
