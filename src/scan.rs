//! File enumeration shared by organize, duplicate detection and stats.

use crate::config::CompiledFilters;
use crate::error::{Error, FileFailure, Result};
use crate::history::HISTORY_FILE_NAME;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Files found under a root, plus entries that could not be read.
#[derive(Debug, Default)]
pub struct Scan {
    /// Regular files in enumeration order (sorted by name within each directory).
    pub files: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

/// Checks that `root` exists and is a directory.
pub fn validate_root(root: &Path) -> Result<()> {
    let metadata = fs::metadata(root).map_err(|e| Error::InvalidRoot {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    if !metadata.is_dir() {
        return Err(Error::InvalidRoot {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    Ok(())
}

/// Enumerates regular files under `root`.
///
/// With `recursive` unset only the immediate children are listed. Symlinks and
/// directories never appear in the result. Hidden directories are not entered
/// unless the filters enable hidden files. Move history files are never listed,
/// whatever the filters say.
pub fn scan_files(root: &Path, recursive: bool, filters: &CompiledFilters) -> Result<Scan> {
    validate_root(root)?;

    let max_depth = if recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !entry.file_type().is_dir() || filters.should_descend(&relative(root, entry))
        });

    let mut scan = Scan::default();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                log::warn!("Error walking {}: {}", path.display(), err);
                scan.failures.push(FileFailure::new(path, err));
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name() == HISTORY_FILE_NAME || filters.is_excluded_path(entry.path()) {
            continue;
        }
        if filters.should_include(&relative(root, &entry)) {
            scan.files.push(entry.into_path());
        }
    }

    log::debug!(
        "Scanned {}: {} files, {} unreadable entries",
        root.display(),
        scan.files.len(),
        scan.failures.len()
    );
    Ok(scan)
}

fn relative(root: &Path, entry: &DirEntry) -> PathBuf {
    entry
        .path()
        .strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| entry.path().to_path_buf())
}
