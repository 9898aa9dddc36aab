//! Host install step: move a renamed folder under the install root.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::artifact::{ArtifactId, ArtifactKind};
use crate::fs_move::FsMover;
use crate::ports::{DirectoryMover, FinalizeOutcome, InstallFinalizer};

/// [`InstallFinalizer`] that places artifacts at
/// `{root}/plugins/{identifier}` or `{root}/themes/{identifier}`.
pub struct DirectoryFinalizer {
    root: PathBuf,
    mover: Arc<dyn DirectoryMover>,
}

impl std::fmt::Debug for DirectoryFinalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryFinalizer")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl DirectoryFinalizer {
    /// Finalizer installing under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mover: Arc::new(FsMover),
        }
    }

    /// Where an artifact of `kind` named `identifier` ends up.
    #[must_use]
    pub fn destination(&self, identifier: &ArtifactId, kind: ArtifactKind) -> PathBuf {
        self.root
            .join(kind.activation_surface())
            .join(identifier.as_str())
    }
}

fn classify(err: &io::Error) -> FinalizeOutcome {
    match err.kind() {
        io::ErrorKind::AlreadyExists | io::ErrorKind::DirectoryNotEmpty => {
            FinalizeOutcome::AlreadyInstalled
        },
        io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
            FinalizeOutcome::PermissionDenied
        },
        _ => FinalizeOutcome::Failed("could not move the artifact into place".into()),
    }
}

#[async_trait]
impl InstallFinalizer for DirectoryFinalizer {
    async fn finalize(
        &self,
        dir: &Path,
        identifier: &ArtifactId,
        kind: ArtifactKind,
    ) -> FinalizeOutcome {
        let dest = self.destination(identifier, kind);
        if tokio::fs::symlink_metadata(&dest).await.is_ok() {
            return FinalizeOutcome::AlreadyInstalled;
        }
        if let Some(parent) = dest.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            warn!(error = %e, %identifier, "cannot create install directory");
            return classify(&e);
        }

        match self.mover.move_dir(dir, &dest).await {
            Ok(()) => {
                info!(%identifier, %kind, dest = %dest.display(), "artifact installed");
                FinalizeOutcome::Installed
            },
            Err(e) => {
                warn!(error = %e, %identifier, "finalize failed");
                classify(&e)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("main.php"), "x").unwrap();
        path
    }

    #[tokio::test]
    async fn installs_plugin_under_plugins() {
        let root = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let src = staged(staging.path(), "widget");
        let id = ArtifactId::new("widget").unwrap();

        let finalizer = DirectoryFinalizer::new(root.path());
        let outcome = finalizer.finalize(&src, &id, ArtifactKind::Plugin).await;
        assert_eq!(outcome, FinalizeOutcome::Installed);
        assert!(root.path().join("plugins/widget/main.php").is_file());
    }

    #[tokio::test]
    async fn installs_theme_under_themes() {
        let root = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let src = staged(staging.path(), "skin");
        let id = ArtifactId::new("skin").unwrap();

        let outcome = DirectoryFinalizer::new(root.path())
            .finalize(&src, &id, ArtifactKind::Theme)
            .await;
        assert_eq!(outcome, FinalizeOutcome::Installed);
        assert!(root.path().join("themes/skin").is_dir());
    }

    #[tokio::test]
    async fn existing_destination_is_already_installed() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("plugins/widget")).unwrap();
        let staging = tempfile::tempdir().unwrap();
        let src = staged(staging.path(), "widget");
        let id = ArtifactId::new("widget").unwrap();

        let outcome = DirectoryFinalizer::new(root.path())
            .finalize(&src, &id, ArtifactKind::Plugin)
            .await;
        assert_eq!(outcome, FinalizeOutcome::AlreadyInstalled);
        assert!(src.exists());
    }

    #[test]
    fn io_errors_are_classified() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(classify(&denied), FinalizeOutcome::PermissionDenied);
        let exists = io::Error::from(io::ErrorKind::AlreadyExists);
        assert_eq!(classify(&exists), FinalizeOutcome::AlreadyInstalled);
        let other = io::Error::from(io::ErrorKind::InvalidData);
        assert!(matches!(classify(&other), FinalizeOutcome::Failed(_)));
    }
}
