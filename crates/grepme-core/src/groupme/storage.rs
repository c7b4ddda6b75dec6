//! Access token storage in the user data directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialsFile {
    token: Option<String>,
    updated_at: Option<i64>,
}

/// File-backed storage for the GroupMe access token.
///
/// The file is created with mode `0600` inside a `0700` directory on unix.
#[derive(Debug, Clone)]
pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    /// Storage backed by the file at `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Location of the credentials file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored token, if any.
    ///
    /// A missing file or a blank token both yield `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_token(&self) -> Result<Option<String>, CoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CoreError::Io(e)),
        };
        let credentials: CredentialsFile = serde_json::from_str(&contents).map_err(|e| {
            CoreError::Serialization(format!("parsing {}: {e}", self.path.display()))
        })?;
        Ok(credentials
            .token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty()))
    }

    /// Persist `token`, replacing whatever was stored before.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its directory cannot be written.
    pub fn store_token(&self, token: &str) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
            set_permissions(parent, 0o700)?;
        }
        let credentials = CredentialsFile {
            token: Some(token.to_string()),
            updated_at: Some(chrono::Utc::now().timestamp()),
        };
        let payload = serde_json::to_string_pretty(&credentials)
            .map_err(|e| CoreError::Serialization(format!("serializing credentials: {e}")))?;
        fs::write(&self.path, payload)?;
        set_permissions(&self.path, 0o600)?;
        log::debug!("stored access token in {}", self.path.display());
        Ok(())
    }

    /// Delete the stored token. Deleting a token that was never stored is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear_token(&self) -> Result<(), CoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Io(e)),
        }
    }
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
