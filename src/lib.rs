//! tidyfold - file organization with undo
//!
//! This library sorts the files of a directory into category or month
//! subdirectories, records every move so the latest run can be reverted, and
//! reports duplicate files and per-category statistics. An integrity baseline
//! of content digests can be kept for individual files.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod file_category;
pub mod file_organizer;
pub mod hasher;
pub mod history;
pub mod integrity;
pub mod output;
pub mod paths;
pub mod scan;
pub mod stats;
pub mod undo;

pub use config::{CompiledFilters, Config, ConfigError, FilterRules};
pub use duplicates::{DuplicateReport, find_duplicates};
pub use error::{Error, FileFailure, Result};
pub use file_category::{ExtensionMap, FALLBACK_CATEGORY};
pub use file_organizer::{
    NoopObserver, Observer, OrganizeOptions, OrganizeReport, Strategy, organize,
    organize_and_record,
};
pub use hasher::content_digest;
pub use history::{HistoryStore, MoveRecord, RunRecord};
pub use integrity::{FirstSightPolicy, IntegrityBaseline, IntegrityStatus};
pub use paths::unique_path;
pub use stats::{DashboardStats, dashboard_stats, monthly_moves};
pub use undo::{UndoOutcome, UndoReport, undo_last};
