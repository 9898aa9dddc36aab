//! Directory moves that leave the target either absent or complete.

use std::fs;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::ports::DirectoryMover;

/// [`DirectoryMover`] over the local filesystem.
///
/// Tries `rename(2)` first. When source and target are on different
/// filesystems the tree is copied into a temporary sibling of the target and
/// that sibling is renamed into place, then the source is removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMover;

impl FsMover {
    /// Blocking move. See the type docs.
    ///
    /// # Errors
    ///
    /// Fails with `AlreadyExists` if `dst` exists, `InvalidInput` if `src` is
    /// not a real directory, or any I/O error from the move itself.
    pub fn move_blocking(src: &Path, dst: &Path) -> io::Result<()> {
        if fs::symlink_metadata(dst).is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "move target already exists",
            ));
        }
        let meta = fs::symlink_metadata(src)?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "move source is not a directory",
            ));
        }

        match fs::rename(src, dst) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                debug!("rename crosses filesystems, copying instead");
                copy_then_rename(src, dst)?;
                fs::remove_dir_all(src)
            },
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl DirectoryMover for FsMover {
    async fn move_dir(&self, src: &Path, dst: &Path) -> io::Result<()> {
        let src = src.to_path_buf();
        let dst = dst.to_path_buf();
        tokio::task::spawn_blocking(move || Self::move_blocking(&src, &dst))
            .await
            .map_err(io::Error::other)?
    }
}

/// Copy `src` next to `dst` and rename the copy into place.
pub(crate) fn copy_then_rename(src: &Path, dst: &Path) -> io::Result<()> {
    let parent = dst
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no parent"))?;
    let scratch = tempfile::Builder::new()
        .prefix(".patchhub-move-")
        .tempdir_in(parent)?;
    let staged = scratch.path().join("tree");
    copy_tree(src, &staged)?;
    fs::rename(&staged, dst)
}

fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dst.join(entry.file_name());
        if file_type.is_symlink() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "refusing to copy a symlink",
            ));
        } else if file_type.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
