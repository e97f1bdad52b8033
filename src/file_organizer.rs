/// File organization: moving files into category or month subdirectories.
///
/// [`organize`] enumerates the files under a target root, computes a
/// destination for each one and moves it there (or only reports the move in
/// dry-run mode). A file that cannot be processed is reported as a
/// [`FileFailure`] and the run carries on with the next file.
use crate::config::CompiledFilters;
use crate::error::{FileFailure, Result};
use crate::file_category::ExtensionMap;
use crate::history::{HistoryStore, MoveRecord, RunRecord};
use crate::paths::{entry_exists, move_file, unique_path_with};
use crate::scan::{scan_files, validate_root};
use chrono::{DateTime, Datelike, Local, Utc};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// How destination directories are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// `<root>/<category>` from the file extension.
    #[default]
    ByType,
    /// `<root>/<YYYY>-<MM>` from the file's modification time (local time).
    ByDate,
}

/// Options for a single organize run.
#[derive(Debug, Clone, Default)]
pub struct OrganizeOptions {
    pub strategy: Strategy,
    /// Compute destinations without touching the filesystem.
    pub dry_run: bool,
    /// Descend into subdirectories instead of only the root's own files.
    pub recursive: bool,
    /// Detect the type of extensionless files from their content.
    pub sniff_extensionless: bool,
    /// Which files take part.
    pub filters: CompiledFilters,
}

/// Result of an organize run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizeReport {
    /// One record per processed file, in enumeration order.
    pub records: Vec<MoveRecord>,
    /// Files that could not be processed.
    pub failures: Vec<FileFailure>,
    /// Files already sitting in their destination directory.
    pub already_in_place: usize,
}

impl OrganizeReport {
    /// Number of files per destination directory name.
    pub fn destination_counts(&self) -> std::collections::BTreeMap<String, usize> {
        let mut counts = std::collections::BTreeMap::new();
        for record in &self.records {
            let dir = record
                .destination
                .parent()
                .and_then(Path::file_name)
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();
            *counts.entry(dir).or_insert(0) += 1;
        }
        counts
    }
}

/// Receives progress events from an organize run.
///
/// Each file counted by `on_start` produces exactly one of `on_moved`,
/// `on_failed` or `on_skipped`. All methods default to doing nothing.
pub trait Observer {
    fn on_start(&mut self, _total_files: usize) {}
    fn on_moved(&mut self, _record: &MoveRecord) {}
    fn on_failed(&mut self, _failure: &FileFailure) {}
    /// Called for a file that already sits in its destination directory.
    fn on_skipped(&mut self, _path: &Path) {}
    /// Called once after the last file; the run-completed event.
    fn on_finished(&mut self, _report: &OrganizeReport) {}
}

/// An [`Observer`] that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// Organizes the files under `root`.
///
/// # Errors
///
/// Fails only if `root` is not an existing directory, in which case nothing is
/// touched. Per-file problems end up in [`OrganizeReport::failures`].
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use tidyfold::file_category::ExtensionMap;
/// use tidyfold::file_organizer::{organize, NoopObserver, OrganizeOptions};
///
/// let options = OrganizeOptions { dry_run: true, ..Default::default() };
/// let root = Path::new("/home/me/Downloads");
/// let report = organize(root, &ExtensionMap::default(), &options, &mut NoopObserver)?;
/// for record in &report.records {
///     println!("{} -> {}", record.source.display(), record.destination.display());
/// }
/// # Ok::<(), tidyfold::Error>(())
/// ```
pub fn organize(
    root: &Path,
    map: &ExtensionMap,
    options: &OrganizeOptions,
    observer: &mut dyn Observer,
) -> Result<OrganizeReport> {
    organize_excluding(root, map, options, None, observer)
}

/// Runs [`organize`] and appends the run to `history` if anything was moved.
///
/// Dry runs and runs without moves are never recorded. The history file itself
/// is kept out of the scan.
pub fn organize_and_record(
    root: &Path,
    map: &ExtensionMap,
    options: &OrganizeOptions,
    history: &HistoryStore,
    observer: &mut dyn Observer,
) -> Result<OrganizeReport> {
    let report = organize_excluding(root, map, options, Some(history.path()), observer)?;

    if !options.dry_run && !report.records.is_empty() {
        let target_root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        history.append(RunRecord::new(target_root, report.records.clone()))?;
        log::info!(
            "Recorded {} moves in {}",
            report.records.len(),
            history.path().display()
        );
    }

    Ok(report)
}

fn organize_excluding(
    root: &Path,
    map: &ExtensionMap,
    options: &OrganizeOptions,
    history_path: Option<&Path>,
    observer: &mut dyn Observer,
) -> Result<OrganizeReport> {
    validate_root(root)?;
    let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());

    let mut filters = options.filters.clone();
    if let Some(path) = history_path {
        filters.exclude_path(&std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()));
    }

    let scan = scan_files(&root, options.recursive, &filters)?;
    log::info!(
        "Organizing {} files in {} ({:?}, dry_run={}, recursive={})",
        scan.files.len(),
        root.display(),
        options.strategy,
        options.dry_run,
        options.recursive
    );

    let mut organizer = FileOrganizer {
        root: &root,
        map,
        options,
        reserved: HashSet::new(),
    };

    // Unreadable scan entries are reported but not counted as processed files.
    let mut report = OrganizeReport {
        failures: scan.failures,
        ..Default::default()
    };

    observer.on_start(scan.files.len());
    for file in &scan.files {
        match organizer.process(file) {
            Ok(Some(record)) => {
                observer.on_moved(&record);
                report.records.push(record);
            }
            Ok(None) => {
                observer.on_skipped(file);
                report.already_in_place += 1;
            }
            Err(reason) => {
                log::warn!("Could not organize {}: {}", file.display(), reason);
                let failure = FileFailure::new(file, reason);
                observer.on_failed(&failure);
                report.failures.push(failure);
            }
        }
    }

    observer.on_finished(&report);
    Ok(report)
}

/// Per-run state: the paths handed out so far, so that destinations stay
/// distinct even when nothing is written (dry run).
struct FileOrganizer<'a> {
    root: &'a Path,
    map: &'a ExtensionMap,
    options: &'a OrganizeOptions,
    reserved: HashSet<PathBuf>,
}

impl FileOrganizer<'_> {
    /// Moves one file. `Ok(None)` means it was already in its destination directory.
    fn process(&mut self, file: &Path) -> std::result::Result<Option<MoveRecord>, String> {
        // History records are JSON strings; a name that can't be recorded is never moved.
        if file.to_str().is_none() {
            return Err("name is not valid UTF-8".to_string());
        }

        let dest_dir = self.destination_dir(file)?;
        if file.parent() == Some(dest_dir.as_path()) {
            log::debug!("{} is already in place", file.display());
            return Ok(None);
        }

        let file_name = file
            .file_name()
            .ok_or_else(|| "file has no name component".to_string())?;

        if !self.options.dry_run {
            fs::create_dir_all(&dest_dir).map_err(|e| {
                format!("failed to create directory {}: {}", dest_dir.display(), e)
            })?;
        }

        let reserved = &self.reserved;
        let destination = unique_path_with(&dest_dir.join(file_name), |candidate| {
            reserved.contains(candidate) || entry_exists(candidate)
        });

        if !self.options.dry_run {
            move_file(file, &destination)
                .map_err(|e| format!("failed to move to {}: {}", destination.display(), e))?;
            log::debug!("Moved {} -> {}", file.display(), destination.display());
        }

        self.reserved.insert(destination.clone());
        Ok(Some(MoveRecord {
            source: file.to_path_buf(),
            destination,
            timestamp: Utc::now(),
            dry_run: self.options.dry_run,
        }))
    }

    fn destination_dir(&self, file: &Path) -> std::result::Result<PathBuf, String> {
        match self.options.strategy {
            Strategy::ByType => {
                let category = self.map.classify(file, self.options.sniff_extensionless);
                Ok(self.root.join(category))
            }
            Strategy::ByDate => {
                let modified = fs::metadata(file)
                    .and_then(|meta| meta.modified())
                    .map_err(|e| format!("cannot read modification time: {}", e))?;
                Ok(self.root.join(month_folder(modified.into())))
            }
        }
    }
}

/// Folder name for a by-date destination: `YYYY-MM`.
pub fn month_folder(modified: DateTime<Local>) -> String {
    format!("{}-{:02}", modified.year(), modified.month())
}
