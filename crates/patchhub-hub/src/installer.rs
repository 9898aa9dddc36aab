//! Validate, fetch, rename and finalize an artifact.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::artifact::{ArtifactId, ArtifactKind};
use crate::error::{HubError, HubResult};
use crate::ports::{ArchiveFetcher, DirectoryMover, FinalizeOutcome, InstallFinalizer, Staging};
use crate::validate::UrlValidator;

/// Default overall download timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    /// What was installed.
    pub identifier: ArtifactId,
    /// Kind it was installed as.
    pub kind: ArtifactKind,
    /// Host surface the artifact is activated from.
    pub activation_hint: &'static str,
}

/// The rename a single install call will perform.
///
/// Built from that call's staging area and dropped before the call returns,
/// so concurrent installs never observe each other's identifiers.
#[derive(Debug)]
struct PendingRename {
    source: PathBuf,
    target: PathBuf,
}

impl PendingRename {
    fn new(staging: &Staging, identifier: &ArtifactId) -> Self {
        Self {
            source: staging.source().to_path_buf(),
            target: staging.root().join(identifier.as_str()),
        }
    }

    fn is_noop(&self) -> bool {
        self.source == self.target
    }

    fn target(&self) -> &Path {
        &self.target
    }
}

/// The secure install pipeline.
pub struct SecureInstaller {
    validator: UrlValidator,
    fetcher: Arc<dyn ArchiveFetcher>,
    mover: Arc<dyn DirectoryMover>,
    finalizer: Arc<dyn InstallFinalizer>,
    fetch_timeout: Duration,
}

impl fmt::Debug for SecureInstaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureInstaller")
            .field("validator", &self.validator)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

impl SecureInstaller {
    /// Assemble an installer from its collaborators.
    #[must_use]
    pub fn new(
        validator: UrlValidator,
        fetcher: Arc<dyn ArchiveFetcher>,
        mover: Arc<dyn DirectoryMover>,
        finalizer: Arc<dyn InstallFinalizer>,
    ) -> Self {
        Self {
            validator,
            fetcher,
            mover,
            finalizer,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Override the download timeout.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Install the archive at `url` as `identifier`.
    ///
    /// Nothing is fetched or touched on disk unless `url` validates for
    /// `identifier`.
    ///
    /// # Errors
    ///
    /// [`HubError::InvalidSource`] on validation failure,
    /// [`HubError::FetchFailed`] if download or extraction fails,
    /// [`HubError::RenameFailed`] if the extracted folder cannot be renamed,
    /// and the finalize errors ([`HubError::AlreadyInstalled`],
    /// [`HubError::FilesystemPermissionDenied`], [`HubError::InstallFailed`]).
    pub async fn install(
        &self,
        url: &str,
        identifier: &str,
        kind: ArtifactKind,
    ) -> HubResult<InstallOutcome> {
        let archive = self
            .validator
            .check_logged(url, identifier)
            .ok_or_else(|| {
                HubError::InvalidSource("download URL is not an allowed archive URL".into())
            })?;

        let staging = self
            .fetcher
            .fetch_and_extract(&archive, self.fetch_timeout)
            .await
            .map_err(|e| {
                warn!(error = %e, %identifier, "archive fetch failed");
                match e {
                    HubError::FetchFailed(_) => e,
                    other => HubError::FetchFailed(other.to_string()),
                }
            })?;

        let identifier = ArtifactId::new(identifier)?;
        if identifier != *archive.identifier() {
            return Err(HubError::InvalidSource("identifier changed during install".into()));
        }

        let pending = PendingRename::new(&staging, &identifier);
        if pending.is_noop() {
            debug!(%identifier, "extracted folder already has the canonical name");
        } else {
            self.mover
                .move_dir(&pending.source, &pending.target)
                .await
                .map_err(|e| {
                    warn!(error = %e, %identifier, "rename of extracted folder failed");
                    HubError::RenameFailed
                })?;
        }

        let outcome = self
            .finalizer
            .finalize(pending.target(), &identifier, kind)
            .await;
        drop(pending);

        match outcome {
            FinalizeOutcome::Installed => {
                info!(%identifier, %kind, "install complete");
                Ok(InstallOutcome {
                    identifier,
                    kind,
                    activation_hint: kind.activation_surface(),
                })
            },
            FinalizeOutcome::AlreadyInstalled => {
                Err(HubError::AlreadyInstalled(identifier.to_string()))
            },
            FinalizeOutcome::PermissionDenied => {
                warn!(%identifier, "install refused by filesystem permissions");
                Err(HubError::FilesystemPermissionDenied)
            },
            FinalizeOutcome::Failed(msg) => {
                warn!(%identifier, reason = %msg, "install failed");
                Err(HubError::InstallFailed(msg))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const URL: &str = "https://github.com/Sudo-WP/widget/archive/refs/heads/main.zip";

    /// Extracts into `{root}/{folder}` where `folder` is fixed per fetcher.
    struct DirFetcher {
        folder: Option<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ArchiveFetcher for DirFetcher {
        async fn fetch_and_extract(
            &self,
            url: &crate::validate::ArchiveUrl,
            _timeout: Duration,
        ) -> HubResult<Staging> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let dir = tempfile::tempdir().unwrap();
            let folder = self
                .folder
                .clone()
                .unwrap_or_else(|| format!("{}-{}", url.identifier(), url.branch()));
            let source = dir.path().join(folder);
            std::fs::create_dir_all(&source).unwrap();
            Ok(Staging::owned(dir, source))
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl ArchiveFetcher for FailingFetcher {
        async fn fetch_and_extract(
            &self,
            _url: &crate::validate::ArchiveUrl,
            _timeout: Duration,
        ) -> HubResult<Staging> {
            Err(HubError::RegistryUnavailable("boom".into()))
        }
    }

    #[derive(Default)]
    struct CountingMover {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl DirectoryMover for CountingMover {
        async fn move_dir(&self, src: &Path, dst: &Path) -> io::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            std::fs::rename(src, dst)
        }
    }

    struct FixedFinalizer {
        outcome: FinalizeOutcome,
        seen: Mutex<Vec<PathBuf>>,
    }

    impl FixedFinalizer {
        fn new(outcome: FinalizeOutcome) -> Self {
            Self {
                outcome,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl InstallFinalizer for FixedFinalizer {
        async fn finalize(
            &self,
            dir: &Path,
            _identifier: &ArtifactId,
            _kind: ArtifactKind,
        ) -> FinalizeOutcome {
            assert!(dir.is_dir());
            self.seen.lock().unwrap().push(dir.to_path_buf());
            self.outcome.clone()
        }
    }

    struct Harness {
        fetcher: Arc<DirFetcher>,
        mover: Arc<CountingMover>,
        finalizer: Arc<FixedFinalizer>,
        installer: SecureInstaller,
    }

    fn harness(folder: Option<&str>, mover_fails: bool, outcome: FinalizeOutcome) -> Harness {
        let fetcher = Arc::new(DirFetcher {
            folder: folder.map(str::to_owned),
            calls: AtomicUsize::new(0),
        });
        let mover = Arc::new(CountingMover {
            calls: AtomicUsize::new(0),
            fail: mover_fails,
        });
        let finalizer = Arc::new(FixedFinalizer::new(outcome));
        let installer = SecureInstaller::new(
            UrlValidator::new("Sudo-WP"),
            fetcher.clone(),
            mover.clone(),
            finalizer.clone(),
        );
        Harness {
            fetcher,
            mover,
            finalizer,
            installer,
        }
    }

    #[tokio::test]
    async fn renames_and_finalizes() {
        let h = harness(None, false, FinalizeOutcome::Installed);
        let outcome = h
            .installer
            .install(URL, "widget", ArtifactKind::Plugin)
            .await
            .unwrap();
        assert_eq!(outcome.identifier.as_str(), "widget");
        assert_eq!(outcome.activation_hint, "plugins");
        assert_eq!(h.mover.calls.load(Ordering::SeqCst), 1);
        let seen = h.finalizer.seen.lock().unwrap();
        assert!(seen[0].ends_with("widget"));
    }

    #[tokio::test]
    async fn theme_hint() {
        let h = harness(None, false, FinalizeOutcome::Installed);
        let outcome = h
            .installer
            .install(URL, "widget", ArtifactKind::Theme)
            .await
            .unwrap();
        assert_eq!(outcome.activation_hint, "themes");
    }

    #[tokio::test]
    async fn invalid_url_has_no_side_effects() {
        let h = harness(None, false, FinalizeOutcome::Installed);
        let err = h
            .installer
            .install("https://evil.com/x.zip", "widget", ArtifactKind::Plugin)
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::InvalidSource(_)));
        assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.mover.calls.load(Ordering::SeqCst), 0);
        assert!(h.finalizer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn canonical_folder_skips_rename() {
        let h = harness(Some("widget"), false, FinalizeOutcome::Installed);
        h.installer
            .install(URL, "widget", ArtifactKind::Plugin)
            .await
            .unwrap();
        assert_eq!(h.mover.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.finalizer.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rename_failure_stops_before_finalize() {
        let h = harness(None, true, FinalizeOutcome::Installed);
        let err = h
            .installer
            .install(URL, "widget", ArtifactKind::Plugin)
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::RenameFailed));
        assert!(h.finalizer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn finalize_outcomes_map_one_to_one() {
        let cases = [
            (FinalizeOutcome::AlreadyInstalled, "already_installed"),
            (
                FinalizeOutcome::PermissionDenied,
                "filesystem_permission_denied",
            ),
            (FinalizeOutcome::Failed("disk full".into()), "install_failed"),
        ];
        for (outcome, code) in cases {
            let h = harness(None, false, outcome);
            let err = h
                .installer
                .install(URL, "widget", ArtifactKind::Plugin)
                .await
                .unwrap_err();
            assert_eq!(err.code(), code);
        }
    }

    #[tokio::test]
    async fn fetch_errors_surface_as_fetch_failed() {
        let installer = SecureInstaller::new(
            UrlValidator::new("Sudo-WP"),
            Arc::new(FailingFetcher),
            Arc::new(CountingMover::default()),
            Arc::new(FixedFinalizer::new(FinalizeOutcome::Installed)),
        );
        let err = installer
            .install(URL, "widget", ArtifactKind::Plugin)
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::FetchFailed(_)));
    }
}
