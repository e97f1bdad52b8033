/// Reverting the most recent organize run.
///
/// Undo replays the last [`RunRecord`] backwards, moving every file from its
/// destination to its original location. A file that now occupies an original
/// location is never overwritten: the restored file gets a numbered name next
/// to it instead.
use crate::error::{FileFailure, Result};
use crate::history::{HistoryStore, MoveRecord, RunRecord};
use crate::paths::{move_file, unique_path};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::PathBuf;

/// What an undo call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// The history was empty.
    Nothing,
    /// The run recorded at `run_time` was reverted and removed from history.
    Undone {
        run_time: DateTime<Utc>,
        target_root: PathBuf,
    },
}

/// Result of [`undo_last`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoReport {
    pub outcome: UndoOutcome,
    /// Paths the files were restored to, in restore order.
    pub restored: Vec<PathBuf>,
    /// Records whose destination no longer exists.
    pub skipped: Vec<FileFailure>,
    /// Records whose move back failed.
    pub failed: Vec<FileFailure>,
}

impl UndoReport {
    fn nothing() -> Self {
        Self {
            outcome: UndoOutcome::Nothing,
            restored: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Returns true if every record was restored.
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Reverts the most recent run stored in `history`.
///
/// The run is taken off the history and the shortened history is saved
/// before any file is moved back. The run is therefore dropped even when some
/// files could not be restored; those are listed in [`UndoReport::failed`] and
/// [`UndoReport::skipped`].
///
/// # Errors
///
/// Only a failure to rewrite the history file is returned as an error. In
/// that case no file has been restored and the run is still recorded.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use tidyfold::history::HistoryStore;
/// use tidyfold::undo::{undo_last, UndoOutcome};
///
/// let store = HistoryStore::for_target(Path::new("/home/me/Downloads"));
/// let report = undo_last(&store)?;
/// if report.outcome == UndoOutcome::Nothing {
///     println!("Nothing to undo");
/// }
/// # Ok::<(), tidyfold::Error>(())
/// ```
pub fn undo_last(history: &HistoryStore) -> Result<UndoReport> {
    let Some(run) = history.pop_last()? else {
        log::info!("No runs recorded in {}", history.path().display());
        return Ok(UndoReport::nothing());
    };

    let report = revert_run(&run);
    log::info!(
        "Undid run from {}: {} restored, {} skipped, {} failed",
        run.run_time,
        report.restored.len(),
        report.skipped.len(),
        report.failed.len()
    );
    Ok(report)
}

fn revert_run(run: &RunRecord) -> UndoReport {
    let mut report = UndoReport {
        outcome: UndoOutcome::Undone {
            run_time: run.run_time,
            target_root: run.target_root.clone(),
        },
        ..UndoReport::nothing()
    };

    for record in run.moves.iter().rev().filter(|record| !record.dry_run) {
        if !record.destination.exists() {
            log::warn!(
                "Cannot restore {}: file no longer exists",
                record.destination.display()
            );
            report.skipped.push(FileFailure::new(
                &record.destination,
                "file not found at recorded destination",
            ));
            continue;
        }

        match restore(record) {
            Ok(restored_to) => report.restored.push(restored_to),
            Err(reason) => {
                log::warn!("Failed to restore {}: {}", record.destination.display(), reason);
                report
                    .failed
                    .push(FileFailure::new(&record.destination, reason));
            }
        }
    }

    report
}

fn restore(record: &MoveRecord) -> std::result::Result<PathBuf, String> {
    if let Some(parent) = record.source.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| format!("failed to recreate {}: {}", parent.display(), e))?;
    }

    let target = unique_path(&record.source);
    move_file(&record.destination, &target)
        .map_err(|e| format!("failed to move back to {}: {}", target.display(), e))?;
    log::debug!(
        "Restored {} -> {}",
        record.destination.display(),
        target.display()
    );
    Ok(target)
}
