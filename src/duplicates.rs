//! Content-based duplicate detection.

use crate::config::CompiledFilters;
use crate::error::{FileFailure, Result};
use crate::hasher::content_digest;
use crate::scan::scan_files;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Files grouped by identical content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateReport {
    /// Digest to member paths. Every group has at least two members, listed in
    /// enumeration order.
    pub groups: BTreeMap<String, Vec<PathBuf>>,
    /// Files that could not be hashed, plus entries the scan could not read.
    pub unreadable: Vec<FileFailure>,
}

impl DuplicateReport {
    /// Total number of files that belong to a group.
    pub fn duplicate_files(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Bytes that could be reclaimed by keeping one file per group.
    ///
    /// Files whose size can no longer be read count as zero.
    pub fn wasted_bytes(&self) -> u64 {
        self.groups
            .values()
            .flat_map(|members| members.iter().skip(1))
            .filter_map(|path| fs::metadata(path).ok())
            .map(|meta| meta.len())
            .sum()
    }
}

/// Finds files under `root` whose content digests are equal.
///
/// Equal digests are taken as equal content; no byte-by-byte comparison
/// follows.
pub fn find_duplicates(
    root: &Path,
    recursive: bool,
    filters: &CompiledFilters,
) -> Result<DuplicateReport> {
    let scan = scan_files(root, recursive, filters)?;

    let mut report = DuplicateReport {
        unreadable: scan.failures,
        ..Default::default()
    };

    let mut by_digest: HashMap<String, Vec<PathBuf>> = HashMap::new();
    for file in scan.files {
        match content_digest(&file) {
            Some(digest) => by_digest.entry(digest).or_default().push(file),
            None => report
                .unreadable
                .push(FileFailure::new(file, "could not read file content")),
        }
    }

    report.groups = by_digest
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .collect();

    log::info!(
        "Found {} duplicate groups under {}",
        report.groups.len(),
        root.display()
    );
    Ok(report)
}
