//! Error types shared by the organize, history, undo and scan operations.
//!
//! Per-file problems inside a batch are never returned as `Err`: they are
//! collected as [`FileFailure`] values next to the successes. `Error` is reserved
//! for structural failures that stop the whole call.

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop an engine operation.
#[derive(Debug, Error)]
pub enum Error {
    /// The target root does not exist or is not a directory.
    #[error("Invalid target root {}: {reason}", path.display())]
    InvalidRoot { path: PathBuf, reason: String },

    /// The history artifact could not be written.
    #[error("Failed to write history file {}: {source}", path.display())]
    HistoryWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The integrity baseline could not be written.
    #[error("Failed to write integrity baseline {}: {source}", path.display())]
    BaselineWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// In-memory state could not be serialized.
    #[error("Failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        source: serde_json::Error,
    },

    /// A single file named by the caller could not be read.
    #[error("Cannot read {}", path.display())]
    Unreadable { path: PathBuf },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A file that was skipped during a batch operation, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl FileFailure {
    pub fn new(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Display for FileFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}
