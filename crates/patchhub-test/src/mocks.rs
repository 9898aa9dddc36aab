//! Mock implementations of the hub's collaborator traits.
//!
//! All mocks use `std::sync::Mutex` internally and are cheap to clone; clones
//! share state, so a test can keep one handle for assertions and pass another
//! into the hub.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use patchhub_hub::{
    ArchiveFetcher, ArchiveUrl, ArtifactId, ArtifactKind, CredentialStore, DirectoryMover,
    FinalizeOutcome, HubError, HubResult, InstallFinalizer, RegistryError, RegistrySearch,
    SearchQuery, SearchResultItem, Staging, normalize_token,
};

/// Name of the marker file [`MockFetcher`] writes into each extracted
/// folder. It holds the identifier the archive was fetched for.
pub const MARKER_FILE: &str = "PATCHHUB_SOURCE";

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Mock [`RegistrySearch`] returning queued results.
///
/// When the queue is empty it returns the default result (no items).
#[derive(Debug, Clone, Default)]
pub struct MockRegistry {
    responses: Arc<Mutex<VecDeque<Result<Vec<SearchResultItem>, RegistryError>>>>,
    default_items: Arc<Mutex<Vec<SearchResultItem>>>,
    queries: Arc<Mutex<Vec<SearchQuery>>>,
}

impl MockRegistry {
    /// Create a mock with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Items returned whenever the queue is empty.
    #[must_use]
    pub fn with_items(self, items: Vec<SearchResultItem>) -> Self {
        *lock(&self.default_items) = items;
        self
    }

    /// Queue one response.
    #[must_use]
    pub fn with_response(self, response: Result<Vec<SearchResultItem>, RegistryError>) -> Self {
        lock(&self.responses).push_back(response);
        self
    }

    /// Queue one error.
    #[must_use]
    pub fn with_error(self, error: RegistryError) -> Self {
        self.with_response(Err(error))
    }

    /// Number of searches issued.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.queries).len()
    }

    /// Every query received, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<SearchQuery> {
        lock(&self.queries).clone()
    }
}

#[async_trait]
impl RegistrySearch for MockRegistry {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultItem>, RegistryError> {
        lock(&self.queries).push(query.clone());
        let queued = lock(&self.responses).pop_front();
        queued.unwrap_or_else(|| Ok(lock(&self.default_items).clone()))
    }
}

/// Mock [`ArchiveFetcher`] that fabricates an extracted archive on disk.
///
/// Each call creates a fresh temporary staging directory holding a
/// `{identifier}-{branch}` folder (or a fixed folder name) with a
/// [`MARKER_FILE`] naming the identifier.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    urls: Arc<Mutex<Vec<String>>>,
    folder: Option<String>,
    error: Option<String>,
    delay: Option<Duration>,
}

impl MockFetcher {
    /// Create a fetcher that succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Always extract into this folder name.
    #[must_use]
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Fail every call with [`HubError::FetchFailed`].
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// Sleep before extracting, to interleave concurrent installs.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.urls).len()
    }

    /// URLs fetched, in order.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        lock(&self.urls).clone()
    }
}

#[async_trait]
impl ArchiveFetcher for MockFetcher {
    async fn fetch_and_extract(&self, url: &ArchiveUrl, _timeout: Duration) -> HubResult<Staging> {
        lock(&self.urls).push(url.as_str().to_owned());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.error {
            return Err(HubError::FetchFailed(message.clone()));
        }

        let dir = tempfile::tempdir().map_err(|e| HubError::FetchFailed(e.to_string()))?;
        let folder = self
            .folder
            .clone()
            .unwrap_or_else(|| format!("{}-{}", url.identifier(), url.branch()));
        let source = dir.path().join(folder);
        std::fs::create_dir_all(&source).map_err(|e| HubError::FetchFailed(e.to_string()))?;
        std::fs::write(source.join(MARKER_FILE), url.identifier().as_str())
            .map_err(|e| HubError::FetchFailed(e.to_string()))?;
        Ok(Staging::owned(dir, source))
    }
}

/// [`DirectoryMover`] that renames for real and records every move.
#[derive(Debug, Clone, Default)]
pub struct RecordingMover {
    moves: Arc<Mutex<Vec<(PathBuf, PathBuf)>>>,
    fail: bool,
}

impl RecordingMover {
    /// Create a mover that performs renames.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every move with `PermissionDenied`.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of moves attempted.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.moves).len()
    }

    /// `(source, target)` pairs, in order.
    #[must_use]
    pub fn moves(&self) -> Vec<(PathBuf, PathBuf)> {
        lock(&self.moves).clone()
    }
}

#[async_trait]
impl DirectoryMover for RecordingMover {
    async fn move_dir(&self, src: &Path, dst: &Path) -> io::Result<()> {
        lock(&self.moves).push((src.to_path_buf(), dst.to_path_buf()));
        if self.fail {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        std::fs::rename(src, dst)
    }
}

/// What [`MockFinalizer`] saw for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeCall {
    /// Identifier passed in.
    pub identifier: String,
    /// Kind passed in.
    pub kind: ArtifactKind,
    /// Final path component of the folder handed over.
    pub folder_name: String,
    /// Contents of [`MARKER_FILE`] in that folder, if present.
    pub marker: Option<String>,
}

/// [`InstallFinalizer`] that records calls and returns a fixed outcome.
#[derive(Debug, Clone)]
pub struct MockFinalizer {
    calls: Arc<Mutex<Vec<FinalizeCall>>>,
    outcome: FinalizeOutcome,
}

impl Default for MockFinalizer {
    fn default() -> Self {
        Self {
            calls: Arc::default(),
            outcome: FinalizeOutcome::Installed,
        }
    }
}

impl MockFinalizer {
    /// Create a finalizer reporting [`FinalizeOutcome::Installed`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report this outcome instead.
    #[must_use]
    pub fn with_outcome(mut self, outcome: FinalizeOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Number of finalize calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Recorded calls, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<FinalizeCall> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl InstallFinalizer for MockFinalizer {
    async fn finalize(
        &self,
        dir: &Path,
        identifier: &ArtifactId,
        kind: ArtifactKind,
    ) -> FinalizeOutcome {
        let call = FinalizeCall {
            identifier: identifier.to_string(),
            kind,
            folder_name: dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            marker: std::fs::read_to_string(dir.join(MARKER_FILE)).ok(),
        };
        lock(&self.calls).push(call);
        self.outcome.clone()
    }
}

/// In-memory [`CredentialStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    token: Arc<Mutex<Option<String>>>,
}

impl MemoryCredentialStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding `token`.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(Mutex::new(Some(token.into()))),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get_token(&self) -> Option<String> {
        lock(&self.token).clone()
    }

    fn set_token(&self, token: &str) -> HubResult<bool> {
        let Some(token) = normalize_token(token) else {
            return Ok(false);
        };
        *lock(&self.token) = Some(token);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_keeps_token_on_blank_input() {
        let store = MemoryCredentialStore::with_token("ghp_a");
        assert!(!store.set_token("  ").unwrap());
        assert_eq!(store.get_token().as_deref(), Some("ghp_a"));
        assert!(store.set_token(" ghp_b ").unwrap());
        assert_eq!(store.get_token().as_deref(), Some("ghp_b"));
    }

    #[tokio::test]
    async fn registry_pops_queue_then_defaults() {
        let registry = MockRegistry::new().with_error(RegistryError::RateLimited);
        let query = SearchQuery::new("x", ArtifactKind::Plugin, "Sudo-WP");
        assert!(registry.search(&query).await.is_err());
        assert!(registry.search(&query).await.unwrap().is_empty());
        assert_eq!(registry.call_count(), 2);
    }
}
