//! Collaborator traits the hub depends on.
//!
//! Production implementations live in [`crate::fetch`], [`crate::fs_move`],
//! [`crate::finalize`], [`crate::access`] and [`crate::credentials`]. Tests
//! substitute their own.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::artifact::{ArtifactId, ArtifactKind};
use crate::error::HubResult;
use crate::validate::ArchiveUrl;

/// An extracted archive waiting to be renamed and finalized.
///
/// `source` is the single top-level folder the archive unpacked into and
/// `root` is the directory containing it. Any temporary directory backing
/// the staging area is owned here and removed when the value is dropped.
#[derive(Debug)]
pub struct Staging {
    root: PathBuf,
    source: PathBuf,
    _guard: Option<tempfile::TempDir>,
}

impl Staging {
    /// Staging area whose lifetime is managed by someone else.
    #[must_use]
    pub fn new(root: PathBuf, source: PathBuf) -> Self {
        Self {
            root,
            source,
            _guard: None,
        }
    }

    /// Staging area backed by a temporary directory that is removed on drop.
    #[must_use]
    pub fn owned(dir: tempfile::TempDir, source: PathBuf) -> Self {
        Self {
            root: dir.path().to_path_buf(),
            source,
            _guard: Some(dir),
        }
    }

    /// Directory holding the extracted folder.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The extracted folder.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Downloads an archive and extracts it.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Fetch `url` and extract it into a fresh staging area.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HubError::FetchFailed`] on network, size or
    /// extraction failures, including timeouts.
    async fn fetch_and_extract(&self, url: &ArchiveUrl, timeout: Duration) -> HubResult<Staging>;
}

/// Moves a directory to a new path.
#[async_trait]
pub trait DirectoryMover: Send + Sync {
    /// Move `src` to `dst`. `dst` must not exist.
    async fn move_dir(&self, src: &Path, dst: &Path) -> io::Result<()>;
}

/// Result of handing a renamed folder to the host install step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The artifact is installed.
    Installed,
    /// An artifact with this identifier is already installed.
    AlreadyInstalled,
    /// The host refused for lack of filesystem permissions.
    PermissionDenied,
    /// Any other failure, with a caller-safe message.
    Failed(String),
}

/// Host-side final install step.
#[async_trait]
pub trait InstallFinalizer: Send + Sync {
    /// Install the folder at `dir` as `identifier`.
    async fn finalize(
        &self,
        dir: &Path,
        identifier: &ArtifactId,
        kind: ArtifactKind,
    ) -> FinalizeOutcome;
}

/// Decides whether a caller may install artifacts.
pub trait CapabilityCheck: Send + Sync {
    /// Whether `identity` holds the install capability.
    fn caller_can_install(&self, identity: &str) -> bool;
}

/// Small persistent store for the registry token.
pub trait CredentialStore: Send + Sync {
    /// The stored token, if any.
    fn get_token(&self) -> Option<String>;

    /// Store a token. The value is trimmed; an empty or whitespace-only value
    /// leaves the existing token untouched. Returns whether anything was
    /// stored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HubError::Credentials`] if persisting fails.
    fn set_token(&self, token: &str) -> HubResult<bool>;
}
