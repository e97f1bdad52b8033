//! Terminal output for the `tidyfold` binary.
//!
//! Every user-facing line goes through [`OutputFormatter`] so styling stays
//! consistent. Diagnostics go through `log` instead.

use crate::error::FileFailure;
use crate::file_organizer::{Observer, OrganizeReport};
use crate::history::MoveRecord;
use crate::stats::round_mb;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::Path;

const PROGRESS_TEMPLATE: &str = "{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Styled printing helpers.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Green line with a check mark.
    ///
    /// ```no_run
    /// use tidyfold::output::OutputFormatter;
    /// OutputFormatter::success("Organized 12 files");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Red line on stderr.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// A progress bar for `total` files. Falls back to the default bar style if
    /// the template is rejected.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        match ProgressStyle::default_bar().template(PROGRESS_TEMPLATE) {
            Ok(style) => pb.set_style(style.progress_chars("█▓░")),
            Err(e) => log::debug!("Using default progress style: {}", e),
        }
        pb
    }

    /// Prints one warning line per failure, under a header.
    pub fn failures(title: &str, failures: &[FileFailure]) {
        if failures.is_empty() {
            return;
        }
        Self::header(title);
        for failure in failures {
            Self::warning(&failure.to_string());
        }
    }

    /// Table of file counts per category (or per destination folder).
    pub fn summary_table(counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let width = counts.keys().map(String::len).max().unwrap_or(0).max(8);

        println!("{:<width$} | {}", "Category".bold(), "Files".bold());
        println!("{}", "-".repeat(width + 10));
        for (category, count) in counts {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(*count, "file")
            );
        }
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files, "file")
        );
    }

    /// Table of counts and sizes per category.
    pub fn size_table(counts: &BTreeMap<String, usize>, sizes: &BTreeMap<String, u64>) {
        let width = counts.keys().map(String::len).max().unwrap_or(0).max(8);

        println!(
            "{:<width$} | {:>6} | {:>10}",
            "Category".bold(),
            "Files".bold(),
            "Size (MB)".bold()
        );
        println!("{}", "-".repeat(width + 22));
        for (category, count) in counts {
            let bytes = sizes.get(category).copied().unwrap_or(0);
            println!(
                "{:<width$} | {:>6} | {:>10.2}",
                category,
                count,
                round_mb(bytes)
            );
        }
    }

    /// One line per move, relative to `root` where possible.
    pub fn move_line(root: &Path, record: &MoveRecord) {
        let shorten = |path: &Path| {
            path.strip_prefix(root)
                .unwrap_or(path)
                .display()
                .to_string()
        };
        println!(
            " - {} {} {}",
            shorten(&record.source),
            "→".dimmed(),
            shorten(&record.destination).green()
        );
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

/// Drives a progress bar from organize events.
pub struct ProgressObserver {
    bar: Option<ProgressBar>,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self { bar: None }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for ProgressObserver {
    fn on_start(&mut self, total_files: usize) {
        self.bar = Some(OutputFormatter::create_progress_bar(total_files as u64));
    }

    fn on_moved(&mut self, record: &MoveRecord) {
        if let Some(bar) = &self.bar {
            if let Some(name) = record.source.file_name() {
                bar.set_message(name.to_string_lossy().to_string());
            }
            bar.inc(1);
        }
    }

    fn on_failed(&mut self, _failure: &FileFailure) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_skipped(&mut self, _path: &Path) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_finished(&mut self, report: &OrganizeReport) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        log::debug!(
            "Run finished: {} records, {} failures",
            report.records.len(),
            report.failures.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "file"), "file");
        assert_eq!(plural(0, "file"), "files");
        assert_eq!(plural(3, "run"), "runs");
    }

    #[test]
    fn test_progress_observer_lifecycle() {
        let mut observer = ProgressObserver::new();
        observer.on_start(2);
        assert_eq!(observer.bar.as_ref().map(|b| b.length()), Some(Some(2)));
        observer.on_failed(&FileFailure::new("/tmp/x", "boom"));
        assert_eq!(observer.bar.as_ref().map(|b| b.position()), Some(1));
        observer.on_finished(&OrganizeReport::default());
        assert!(observer.bar.is_none());
    }

    #[test]
    fn test_progress_observer_counts_files_already_in_place() {
        let mut observer = ProgressObserver::new();
        observer.on_start(2);
        observer.on_skipped(Path::new("/tmp/Images/a.jpg"));
        observer.on_skipped(Path::new("/tmp/Documents/b.md"));
        let bar = observer.bar.as_ref().expect("bar is running");
        assert_eq!(bar.length(), Some(bar.position()));
    }
}
