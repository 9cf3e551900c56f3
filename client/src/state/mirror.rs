//! Optional durable copy of the access token.
//!
//! DESIGN
//! ======
//! The in-memory [`TokenStore`](super::token_store::TokenStore) is the only
//! source of truth. A mirror only lets a fresh process pick up where the last
//! one left off; failures to read or write it are logged and otherwise ignored.
//! Only the access token is ever written, under the `authToken` key.

#[cfg(test)]
#[path = "mirror_test.rs"]
mod tests;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::TokenPersistence;

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("mirror I/O failed for {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("mirror file {path} is malformed: {message}")]
    Malformed { path: PathBuf, message: String },
}

pub trait TokenMirror: Send + Sync {
    /// Read the mirrored access token, if any.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError`] when the backing store cannot be read.
    fn load(&self) -> Result<Option<String>, MirrorError>;

    /// Replace the mirrored access token.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError`] when the backing store cannot be written.
    fn store(&self, access_token: &str) -> Result<(), MirrorError>;

    /// Remove the mirrored access token. Removing a missing token is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError`] when the backing store cannot be modified.
    fn clear(&self) -> Result<(), MirrorError>;
}

/// Build the mirror for a persistence policy.
#[must_use]
pub fn mirror_for(policy: &TokenPersistence) -> Arc<dyn TokenMirror> {
    match policy {
        TokenPersistence::Memory => Arc::new(NoMirror),
        TokenPersistence::Mirror(path) => Arc::new(FileMirror::new(path.clone())),
    }
}

// =============================================================================
// MEMORY ONLY
// =============================================================================

pub struct NoMirror;

impl TokenMirror for NoMirror {
    fn load(&self) -> Result<Option<String>, MirrorError> {
        Ok(None)
    }

    fn store(&self, _access_token: &str) -> Result<(), MirrorError> {
        Ok(())
    }

    fn clear(&self) -> Result<(), MirrorError> {
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

#[derive(Serialize, Deserialize)]
struct MirrorFile {
    #[serde(rename = "authToken")]
    auth_token: String,
}

/// JSON file mirror: `{"authToken": "<access token>"}`.
pub struct FileMirror {
    path: PathBuf,
}

impl FileMirror {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> MirrorError {
        MirrorError::Io { path: self.path.clone(), source }
    }
}

impl TokenMirror for FileMirror {
    fn load(&self) -> Result<Option<String>, MirrorError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let file: MirrorFile = serde_json::from_str(&raw)
            .map_err(|e| MirrorError::Malformed { path: self.path.clone(), message: e.to_string() })?;
        Ok(Some(file.auth_token).filter(|t| !t.is_empty()))
    }

    fn store(&self, access_token: &str) -> Result<(), MirrorError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let body = serde_json::to_string(&MirrorFile { auth_token: access_token.to_owned() })
            .map_err(|e| MirrorError::Malformed { path: self.path.clone(), message: e.to_string() })?;

        // Write-then-rename keeps a reader from seeing a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|e| self.io_error(e))?;
        restrict_permissions(&tmp).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }

    fn clear(&self) -> Result<(), MirrorError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
