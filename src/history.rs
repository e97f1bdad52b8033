/// Move history persistence.
///
/// Every organize run that actually moved files is stored as a [`RunRecord`]
/// in a single JSON file. The file is always rewritten as a whole, through a
/// temporary sibling and a rename, so a reader never observes a partial write.
///
/// The read-modify-write cycle of [`HistoryStore::append`] and
/// [`HistoryStore::pop_last`] is not locked: two processes working on the same
/// history file at once can lose runs.
use crate::config::Config;
use crate::error::{Error, Result};
use crate::paths::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default history file name, created inside the organized directory.
pub const HISTORY_FILE_NAME: &str = ".tidyfold_history.json";

/// One file move, performed or proposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Where the file was before the move.
    pub source: PathBuf,
    /// Where the file was (or would be) moved to.
    pub destination: PathBuf,
    /// When the move was computed.
    pub timestamp: DateTime<Utc>,
    /// True if the move was only simulated.
    pub dry_run: bool,
}

/// All moves performed by one organize run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_time: DateTime<Utc>,
    /// The directory that was organized.
    pub target_root: PathBuf,
    /// Moves in the order they were performed.
    pub moves: Vec<MoveRecord>,
}

impl RunRecord {
    /// Creates a run record stamped with the current time.
    pub fn new(target_root: PathBuf, moves: Vec<MoveRecord>) -> Self {
        Self {
            run_time: Utc::now(),
            target_root,
            moves,
        }
    }
}

/// Reads and writes the history file.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// A store backed by an explicit file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The default store for a target directory: `<root>/.tidyfold_history.json`.
    pub fn for_target(root: &Path) -> Self {
        Self::new(root.join(HISTORY_FILE_NAME))
    }

    /// Uses `config.history.path` when set, otherwise [`HistoryStore::for_target`].
    pub fn from_config(root: &Path, config: &Config) -> Self {
        match &config.history.path {
            Some(path) => Self::new(path.clone()),
            None => Self::for_target(root),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all recorded runs, oldest first.
    ///
    /// A missing, unreadable or malformed file yields an empty history.
    pub fn load(&self) -> Vec<RunRecord> {
        if !self.path.exists() {
            return Vec::new();
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Failed to read history {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(runs) => runs,
            Err(e) => {
                log::warn!(
                    "Ignoring malformed history {}: {}",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Overwrites the history file with `runs`.
    pub fn save(&self, runs: &[RunRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(runs).map_err(|e| Error::Serialize {
            what: "move history",
            source: e,
        })?;

        write_atomic(&self.path, json.as_bytes()).map_err(|e| Error::HistoryWrite {
            path: self.path.clone(),
            source: e,
        })?;

        log::debug!(
            "Saved move history ({} runs) to {}",
            runs.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Appends one run and persists the full history.
    pub fn append(&self, run: RunRecord) -> Result<()> {
        let mut runs = self.load();
        runs.push(run);
        self.save(&runs)
    }

    /// Removes the most recent run and persists the remainder.
    ///
    /// Returns `Ok(None)` without touching the file when there is nothing recorded.
    pub fn pop_last(&self) -> Result<Option<RunRecord>> {
        let mut runs = self.load();
        let Some(last) = runs.pop() else {
            return Ok(None);
        };
        self.save(&runs)?;
        Ok(Some(last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_run(root: &Path, names: &[&str]) -> RunRecord {
        let moves = names
            .iter()
            .map(|name| MoveRecord {
                source: root.join(name),
                destination: root.join("Others").join(name),
                timestamp: Utc::now(),
                dry_run: false,
            })
            .collect();
        RunRecord::new(root.to_path_buf(), moves)
    }

    #[test]
    fn test_load_missing_history_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = HistoryStore::for_target(temp_dir.path());
        assert!(store.load().is_empty());
        assert_eq!(store.path(), temp_dir.path().join(HISTORY_FILE_NAME));
    }

    #[test]
    fn test_load_corrupt_history_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = HistoryStore::for_target(temp_dir.path());
        fs::write(store.path(), "{ definitely not a run list").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_append_and_load_preserves_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        let store = HistoryStore::for_target(root);

        let first = sample_run(root, &["a.txt"]);
        let second = sample_run(root, &["b.txt", "c.txt"]);
        store.append(first.clone()).unwrap();
        store.append(second.clone()).unwrap();

        assert_eq!(store.load(), vec![first, second]);
    }

    #[test]
    fn test_history_file_is_readable_json_with_iso_timestamps() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        let store = HistoryStore::for_target(root);
        store.append(sample_run(root, &["a.txt"])).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let run_time = value[0]["run_time"].as_str().expect("run_time string");
        assert!(DateTime::parse_from_rfc3339(run_time).is_ok());
        assert_eq!(value[0]["moves"][0]["dry_run"], serde_json::json!(false));
    }

    #[test]
    fn test_pop_last_removes_only_latest() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        let store = HistoryStore::for_target(root);
        let first = sample_run(root, &["a.txt"]);
        let second = sample_run(root, &["b.txt"]);
        store.save(&[first.clone(), second.clone()]).unwrap();

        assert_eq!(store.pop_last().unwrap(), Some(second));
        assert_eq!(store.load(), vec![first]);
    }

    #[test]
    fn test_pop_last_on_empty_history() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = HistoryStore::for_target(temp_dir.path());
        assert_eq!(store.pop_last().unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_from_config_prefers_explicit_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut config = Config::default();
        config.history.path = Some(temp_dir.path().join("elsewhere.json"));

        let store = HistoryStore::from_config(Path::new("/target"), &config);
        assert_eq!(store.path(), temp_dir.path().join("elsewhere.json"));

        let store = HistoryStore::from_config(Path::new("/target"), &Config::default());
        assert_eq!(store.path(), Path::new("/target").join(HISTORY_FILE_NAME));
    }
}
