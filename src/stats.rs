//! Read-only summaries of a directory and of the move history.

use crate::config::CompiledFilters;
use crate::error::Result;
use crate::file_category::{ExtensionMap, FALLBACK_CATEGORY};
use crate::file_organizer::month_folder;
use crate::history::RunRecord;
use crate::scan::scan_files;
use chrono::Local;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// How many entries [`DashboardStats::largest_files`] keeps.
pub const LARGEST_FILES_LIMIT: usize = 10;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Counts and sizes for a directory tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub total_files: usize,
    pub total_size_bytes: u64,
    /// Files per category. Every configured category and the fallback
    /// category are present, with zero when empty.
    pub counts: BTreeMap<String, usize>,
    /// Bytes per category, keyed like `counts`.
    pub per_category_size_bytes: BTreeMap<String, u64>,
    /// The largest files, biggest first.
    pub largest_files: Vec<(PathBuf, u64)>,
}

impl DashboardStats {
    /// Total size in MiB, rounded to two decimals.
    pub fn total_size_mb(&self) -> f64 {
        round_mb(self.total_size_bytes)
    }
}

/// Converts bytes to MiB rounded to two decimals.
pub fn round_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

/// Classifies every file under `root` and accumulates counts and sizes.
///
/// A file whose size cannot be read is still counted, with no size.
pub fn dashboard_stats(
    root: &Path,
    map: &ExtensionMap,
    recursive: bool,
    filters: &CompiledFilters,
) -> Result<DashboardStats> {
    let scan = scan_files(root, recursive, filters)?;

    let mut stats = DashboardStats::default();
    for category in map.categories().chain(std::iter::once(FALLBACK_CATEGORY)) {
        stats.counts.insert(category.to_string(), 0);
        stats.per_category_size_bytes.insert(category.to_string(), 0);
    }

    let mut sizes = Vec::with_capacity(scan.files.len());
    for file in scan.files {
        let category = map.category_for_path(&file);
        *stats.counts.entry(category.to_string()).or_insert(0) += 1;
        stats.total_files += 1;

        match fs::metadata(&file) {
            Ok(meta) => {
                let len = meta.len();
                stats.total_size_bytes += len;
                *stats
                    .per_category_size_bytes
                    .entry(category.to_string())
                    .or_insert(0) += len;
                sizes.push((file, len));
            }
            Err(e) => log::debug!("No size for {}: {}", file.display(), e),
        }
    }

    // Stable sort keeps enumeration order among equal sizes.
    sizes.sort_by(|a, b| b.1.cmp(&a.1));
    sizes.truncate(LARGEST_FILES_LIMIT);
    stats.largest_files = sizes;

    log::debug!(
        "Stats for {}: {} files, {} bytes",
        root.display(),
        stats.total_files,
        stats.total_size_bytes
    );
    Ok(stats)
}

/// Files moved per month (`YYYY-MM`, local time of the run).
pub fn monthly_moves(runs: &[RunRecord]) -> BTreeMap<String, usize> {
    let mut months = BTreeMap::new();
    for run in runs {
        let key = month_folder(run.run_time.with_timezone(&Local));
        *months.entry(key).or_insert(0) += run.moves.len();
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MoveRecord;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    const MIB: usize = 1024 * 1024;

    #[test]
    fn test_image_and_document_sizes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("photo.jpg"), vec![0u8; MIB]).unwrap();
        fs::write(root.join("report.pdf"), vec![0u8; 2 * MIB]).unwrap();

        let stats = dashboard_stats(
            root,
            &ExtensionMap::default(),
            false,
            &CompiledFilters::default(),
        )
        .unwrap();

        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_size_mb(), 3.0);
        assert_eq!(stats.counts["Images"], 1);
        assert_eq!(stats.counts["Documents"], 1);
        assert_eq!(stats.counts[FALLBACK_CATEGORY], 0);
        assert_eq!(stats.counts["Music"], 0);
        assert_eq!(stats.per_category_size_bytes["Documents"], 2 * MIB as u64);
        assert_eq!(
            stats.largest_files,
            vec![
                (root.join("report.pdf"), 2 * MIB as u64),
                (root.join("photo.jpg"), MIB as u64),
            ]
        );
    }

    #[test]
    fn test_history_file_is_not_counted_with_hidden_files_enabled() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("a.jpg"), "img").unwrap();
        let filters = crate::config::FilterRules {
            enable_hidden_files: true,
            ..Default::default()
        }
        .compile()
        .unwrap();
        let options = crate::file_organizer::OrganizeOptions {
            filters: filters.clone(),
            ..Default::default()
        };
        let store = crate::history::HistoryStore::for_target(root);
        crate::file_organizer::organize_and_record(
            root,
            &ExtensionMap::default(),
            &options,
            &store,
            &mut crate::file_organizer::NoopObserver,
        )
        .unwrap();
        assert!(store.path().is_file());

        let stats = dashboard_stats(root, &ExtensionMap::default(), true, &filters).unwrap();
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.counts["Images"], 1);
        assert_eq!(stats.counts[FALLBACK_CATEGORY], 0);
        assert_eq!(stats.largest_files, vec![(root.join("Images/a.jpg"), 3)]);
    }

    #[test]
    fn test_empty_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let stats = dashboard_stats(
            temp_dir.path(),
            &ExtensionMap::default(),
            true,
            &CompiledFilters::default(),
        )
        .unwrap();
        assert_eq!(stats.total_files, 0);
        assert_eq!(stats.total_size_mb(), 0.0);
        assert_eq!(stats.counts.len(), ExtensionMap::default().len() + 1);
        assert!(stats.largest_files.is_empty());
    }

    #[test]
    fn test_largest_files_is_capped() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        for i in 0..(LARGEST_FILES_LIMIT + 3) {
            fs::write(root.join(format!("f{:02}.dat", i)), vec![1u8; i + 1]).unwrap();
        }

        let stats = dashboard_stats(
            root,
            &ExtensionMap::default(),
            false,
            &CompiledFilters::default(),
        )
        .unwrap();
        assert_eq!(stats.largest_files.len(), LARGEST_FILES_LIMIT);
        assert_eq!(stats.largest_files[0].1, (LARGEST_FILES_LIMIT + 3) as u64);
        assert_eq!(stats.counts[FALLBACK_CATEGORY], LARGEST_FILES_LIMIT + 3);
    }

    #[test]
    fn test_round_mb() {
        assert_eq!(round_mb(0), 0.0);
        assert_eq!(round_mb(1024 * 1024), 1.0);
        assert_eq!(round_mb(1_572_864), 1.5);
        assert_eq!(round_mb(1_000), 0.0);
    }

    #[test]
    fn test_monthly_moves() {
        let record = MoveRecord {
            source: PathBuf::from("/r/a"),
            destination: PathBuf::from("/r/Others/a"),
            timestamp: Utc::now(),
            dry_run: false,
        };
        let run_at = |month: u32, moves: usize| RunRecord {
            run_time: Utc.with_ymd_and_hms(2024, month, 15, 12, 0, 0).unwrap(),
            target_root: PathBuf::from("/r"),
            moves: vec![record.clone(); moves],
        };

        let months = monthly_moves(&[run_at(1, 2), run_at(1, 3), run_at(2, 1)]);
        assert_eq!(months.get("2024-01"), Some(&5));
        assert_eq!(months.get("2024-02"), Some(&1));
        assert_eq!(months.len(), 2);
    }
}
