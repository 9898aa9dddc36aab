//! Safe zip extraction.
//!
//! Branch archives unpack into a single `{repo}-{branch}/` folder. Anything
//! else (loose top-level files, several roots, absolute or escaping paths,
//! symlinks, duplicate entries) is refused. Entry count and total
//! uncompressed size are capped, counting bytes actually written rather than
//! trusting the header.

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{HubError, HubResult};

/// Default maximum number of entries in an archive.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Default maximum total uncompressed size (500 MB).
pub const DEFAULT_MAX_EXTRACTED_BYTES: u64 = 500_000_000;

/// Unix file type bits and the symlink type.
const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// Extraction caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractLimits {
    /// Maximum number of entries.
    pub max_entries: usize,
    /// Maximum total uncompressed bytes written.
    pub max_bytes: u64,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_bytes: DEFAULT_MAX_EXTRACTED_BYTES,
        }
    }
}

fn extraction_error(message: impl Into<String>) -> HubError {
    HubError::FetchFailed(message.into())
}

/// Extract a zip archive into `dest` and return the path of its single
/// top-level folder.
///
/// # Errors
///
/// Returns [`HubError::FetchFailed`] if the archive is malformed, unsafe or
/// exceeds `limits`.
pub fn extract_zip(data: &[u8], dest: &Path, limits: ExtractLimits) -> HubResult<PathBuf> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| extraction_error(format!("not a valid zip archive: {e}")))?;

    if archive.len() > limits.max_entries {
        return Err(extraction_error(format!(
            "archive exceeds maximum entry count ({})",
            limits.max_entries
        )));
    }

    let mut top: Option<PathBuf> = None;
    let mut written: u64 = 0;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| extraction_error(format!("failed to read archive entry: {e}")))?;

        if entry
            .unix_mode()
            .is_some_and(|mode| mode & S_IFMT == S_IFLNK)
        {
            return Err(extraction_error("archive contains a symlink"));
        }

        let path = entry
            .enclosed_name()
            .ok_or_else(|| extraction_error("archive entry escapes the extraction directory"))?;
        if !path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(extraction_error("archive entry has an unsafe path"));
        }

        let mut components = path.components();
        let Some(Component::Normal(first)) = components.next() else {
            return Err(extraction_error("archive entry has an empty path"));
        };
        let first = PathBuf::from(first);
        let nested = components.next().is_some();

        match &top {
            None => top = Some(first),
            Some(existing) if *existing == first => {},
            Some(_) => {
                return Err(extraction_error(
                    "archive must contain a single top-level folder",
                ));
            },
        }

        let target = dest.join(&path);
        if entry.is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| extraction_error(format!("failed to create directory: {e}")))?;
            continue;
        }
        if !nested {
            return Err(extraction_error(
                "archive must contain a single top-level folder",
            ));
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| extraction_error(format!("failed to create directory: {e}")))?;
        }
        let mut out = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .map_err(|e| extraction_error(format!("failed to create file: {e}")))?;

        let remaining = limits.max_bytes.saturating_sub(written);
        let copied = std::io::copy(&mut (&mut entry).take(remaining.saturating_add(1)), &mut out)
            .map_err(|e| extraction_error(format!("failed to extract file: {e}")))?;
        written = written.saturating_add(copied);
        if written > limits.max_bytes {
            return Err(extraction_error(format!(
                "archive exceeds maximum extracted size ({} bytes)",
                limits.max_bytes
            )));
        }
    }

    let top = top.ok_or_else(|| extraction_error("archive is empty"))?;
    let root = dest.join(top);
    if !root.is_dir() {
        return Err(extraction_error(
            "archive must contain a single top-level folder",
        ));
    }

    debug!(entries = archive.len(), bytes = written, "archive extracted");
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Names ending in `/` become directories.
    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    fn branch_archive() -> Vec<u8> {
        build_zip(&[
            ("widget-main/", ""),
            ("widget-main/widget.php", "<?php // widget"),
            ("widget-main/assets/", ""),
            ("widget-main/assets/app.js", "console.log(1)"),
        ])
    }

    #[test]
    fn extracts_single_folder_archive() {
        let dest = tempfile::tempdir().unwrap();
        let root = extract_zip(&branch_archive(), dest.path(), ExtractLimits::default()).unwrap();
        assert_eq!(root, dest.path().join("widget-main"));
        assert_eq!(
            fs::read_to_string(root.join("widget.php")).unwrap(),
            "<?php // widget"
        );
        assert!(root.join("assets/app.js").is_file());
    }

    #[test]
    fn implicit_directories_are_created() {
        let dest = tempfile::tempdir().unwrap();
        let data = build_zip(&[("widget-main/deep/file.txt", "x")]);
        let root = extract_zip(&data, dest.path(), ExtractLimits::default()).unwrap();
        assert!(root.join("deep/file.txt").is_file());
    }

    #[test]
    fn rejects_multiple_roots() {
        let dest = tempfile::tempdir().unwrap();
        let data = build_zip(&[
            ("widget-main/a.txt", "a"),
            ("other/b.txt", "b"),
        ]);
        assert!(extract_zip(&data, dest.path(), ExtractLimits::default()).is_err());
    }

    #[test]
    fn rejects_loose_top_level_file() {
        let dest = tempfile::tempdir().unwrap();
        let data = build_zip(&[("readme.txt", "flat")]);
        assert!(extract_zip(&data, dest.path(), ExtractLimits::default()).is_err());
    }

    #[test]
    fn rejects_traversal() {
        let dest = tempfile::tempdir().unwrap();
        let data = build_zip(&[("widget-main/../../escape.txt", "x")]);
        assert!(extract_zip(&data, dest.path(), ExtractLimits::default()).is_err());
        assert!(!dest.path().parent().unwrap().join("escape.txt").exists());
    }

    #[test]
    fn rejects_absolute_paths() {
        let dest = tempfile::tempdir().unwrap();
        let data = build_zip(&[("/etc/passwd", "x")]);
        assert!(extract_zip(&data, dest.path(), ExtractLimits::default()).is_err());
    }

    #[test]
    fn rejects_symlinks() {
        let dest = tempfile::tempdir().unwrap();
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        writer.add_directory("widget-main/", options).unwrap();
        writer
            .add_symlink("widget-main/link", "/etc/passwd", options)
            .unwrap();
        let data = writer.finish().unwrap().into_inner();
        let err = extract_zip(&data, dest.path(), ExtractLimits::default()).unwrap_err();
        assert!(err.to_string().contains("symlink"));
    }

    #[test]
    fn enforces_entry_cap() {
        let dest = tempfile::tempdir().unwrap();
        let limits = ExtractLimits {
            max_entries: 2,
            ..ExtractLimits::default()
        };
        let err = extract_zip(&branch_archive(), dest.path(), limits).unwrap_err();
        assert!(err.to_string().contains("entry count"));
    }

    #[test]
    fn enforces_size_cap() {
        let dest = tempfile::tempdir().unwrap();
        let big = "a".repeat(4096);
        let data = build_zip(&[("widget-main/big.bin", big.as_str())]);
        let limits = ExtractLimits {
            max_bytes: 1024,
            ..ExtractLimits::default()
        };
        let err = extract_zip(&data, dest.path(), limits).unwrap_err();
        assert!(err.to_string().contains("extracted size"));
    }

    #[test]
    fn rejects_garbage_and_empty() {
        let dest = tempfile::tempdir().unwrap();
        assert!(extract_zip(b"not a zip", dest.path(), ExtractLimits::default()).is_err());
        let empty = build_zip(&[]);
        assert!(extract_zip(&empty, dest.path(), ExtractLimits::default()).is_err());
    }
}
