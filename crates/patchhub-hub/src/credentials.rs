//! Registry token storage.
//!
//! The token lives in a small TOML file next to the user config with owner-only
//! permissions. It is never logged and never appears in `Debug` output.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HubError, HubResult};
use crate::ports::CredentialStore;

/// Shown in place of a configured token. Reveals nothing about its value or
/// length.
pub const TOKEN_MASK: &str = "****************";

/// Credentials files larger than this are refused.
const MAX_CREDENTIALS_FILE_SIZE: u64 = 64 * 1024;

/// Normalize user input for a token update.
///
/// Returns `None` for empty or whitespace-only input, meaning "keep the
/// existing token".
#[must_use]
pub fn normalize_token(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Display form of an optional token.
#[must_use]
pub fn mask_token(token: Option<&str>) -> &'static str {
    match token {
        Some(t) if !t.is_empty() => TOKEN_MASK,
        _ => "not set",
    }
}

#[derive(Default, Serialize, Deserialize)]
struct CredentialsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    github_token: Option<String>,
}

/// [`CredentialStore`] backed by a TOML file.
///
/// A token stored in the file wins over the `fallback` token supplied at
/// construction (usually from config or the environment).
pub struct FileCredentialStore {
    path: PathBuf,
    fallback: Option<String>,
    write_lock: Mutex<()>,
}

impl fmt::Debug for FileCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCredentialStore")
            .field("path", &self.path)
            .field("fallback", &self.fallback.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl FileCredentialStore {
    /// Create a store reading and writing `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fallback: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Token to report when the file holds none.
    #[must_use]
    pub fn with_fallback(mut self, token: Option<String>) -> Self {
        self.fallback = token.as_deref().and_then(normalize_token);
        self
    }

    /// Path of the credentials file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> HubResult<CredentialsFile> {
        let meta = match std::fs::metadata(&self.path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CredentialsFile::default());
            },
            Err(e) => return Err(HubError::Credentials(format!("cannot stat file: {e}"))),
        };
        if meta.len() > MAX_CREDENTIALS_FILE_SIZE {
            return Err(HubError::Credentials("credentials file is too large".into()));
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| HubError::Credentials(format!("cannot read file: {e}")))?;
        toml::from_str(&content)
            .map_err(|_| HubError::Credentials("credentials file is not valid TOML".into()))
    }

    fn write_file(&self, file: &CredentialsFile) -> HubResult<()> {
        let parent = self.path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent)
            .map_err(|e| HubError::Credentials(format!("cannot create directory: {e}")))?;

        let body = toml::to_string(file)
            .map_err(|e| HubError::Credentials(format!("cannot serialize: {e}")))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| HubError::Credentials(format!("cannot create temp file: {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| HubError::Credentials(format!("cannot set permissions: {e}")))?;
        }

        tmp.write_all(body.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| HubError::Credentials(format!("cannot write temp file: {e}")))?;

        tmp.persist(&self.path)
            .map_err(|e| HubError::Credentials(format!("cannot replace file: {}", e.error)))?;

        debug!(path = %self.path.display(), "saved credentials");
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get_token(&self) -> Option<String> {
        let stored = match self.read_file() {
            Ok(file) => file.github_token.as_deref().and_then(normalize_token),
            Err(e) => {
                debug!(error = %e, "ignoring unreadable credentials file");
                None
            },
        };
        stored.or_else(|| self.fallback.clone())
    }

    fn set_token(&self, token: &str) -> HubResult<bool> {
        let Some(token) = normalize_token(token) else {
            return Ok(false);
        };
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| HubError::Credentials("credential store lock poisoned".into()))?;

        // An unreadable file is left alone rather than overwritten.
        let mut file = self.read_file()?;
        file.github_token = Some(token);
        self.write_file(&file)?;
        Ok(true)
    }
}
