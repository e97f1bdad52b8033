//! Command-line interface for tidyfold.
//!
//! Parses arguments with clap and drives the library operations, printing
//! results through [`OutputFormatter`].

use crate::config::Config;
use crate::duplicates::find_duplicates;
use crate::error::Result;
use crate::file_organizer::{OrganizeOptions, Strategy, organize_and_record};
use crate::history::HistoryStore;
use crate::integrity::{
    FirstSightPolicy, IntegrityBaseline, IntegrityStatus, default_baseline_path,
};
use crate::output::{OutputFormatter, ProgressObserver};
use crate::stats::{dashboard_stats, monthly_moves, round_mb};
use crate::undo::{UndoOutcome, undo_last};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Sort files into category or month folders, with undo.
#[derive(Debug, Parser)]
#[command(name = "tidyfold", version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Move files into category (or month) subdirectories
    Organize {
        /// Directory to organize
        dir: PathBuf,

        /// Grouping strategy
        #[arg(long = "by", value_enum, default_value_t = GroupBy::Type)]
        by: GroupBy,

        /// Show what would be moved without moving anything
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Include files in subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Detect the type of files without an extension from their content
        #[arg(long)]
        sniff: bool,

        /// Configuration file (TOML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Revert the most recent organize run
    Undo {
        dir: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List files with identical content
    Duplicates {
        dir: PathBuf,

        #[arg(short, long)]
        recursive: bool,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show file counts and sizes per category
    Stats {
        dir: PathBuf,

        #[arg(short, long)]
        recursive: bool,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show recorded organize runs
    History {
        dir: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Check a file against the integrity baseline
    Verify {
        file: PathBuf,

        /// Baseline file (defaults to the user data directory)
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// Record the file's current digest as trusted
        #[arg(long)]
        trust: bool,
    },
}

/// Values accepted by `organize --by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupBy {
    Type,
    Date,
}

impl From<GroupBy> for Strategy {
    fn from(by: GroupBy) -> Self {
        match by {
            GroupBy::Type => Strategy::ByType,
            GroupBy::Date => Strategy::ByDate,
        }
    }
}

/// Runs one parsed command.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use tidyfold::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["tidyfold", "organize", "/tmp/inbox", "--dry-run"]);
/// run_cli(cli.command)?;
/// # Ok::<(), tidyfold::Error>(())
/// ```
pub fn run_cli(command: Command) -> Result<()> {
    match command {
        Command::Organize {
            dir,
            by,
            dry_run,
            recursive,
            sniff,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let options = OrganizeOptions {
                strategy: by.into(),
                dry_run,
                recursive,
                sniff_extensionless: sniff,
                filters: config.compile_filters()?,
            };
            organize_directory(&dir, &config, &options)
        }
        Command::Undo { dir, config } => {
            let config = load_config(config.as_deref())?;
            undo_organization(&dir, &config)
        }
        Command::Duplicates {
            dir,
            recursive,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            show_duplicates(&dir, &config, recursive)
        }
        Command::Stats {
            dir,
            recursive,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            show_stats(&dir, &config, recursive)
        }
        Command::History { dir, config } => {
            let config = load_config(config.as_deref())?;
            show_history(&dir, &config);
            Ok(())
        }
        Command::Verify {
            file,
            baseline,
            trust,
        } => verify_file(&file, baseline, trust),
    }
}

/// An explicit config path must load. A discovered one that fails is replaced
/// by the defaults with a warning.
fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if explicit.is_some() {
        return Ok(Config::load(explicit)?);
    }
    let (config, error) = Config::load_or_default(None);
    if let Some(e) = error {
        OutputFormatter::warning(&format!("{}; using default configuration", e));
    }
    Ok(config)
}

fn organize_directory(dir: &Path, config: &Config, options: &OrganizeOptions) -> Result<()> {
    let store = HistoryStore::from_config(dir, config);
    OutputFormatter::info(&format!("Organizing contents of: {}", dir.display()));

    let mut observer = ProgressObserver::new();
    let report = organize_and_record(dir, &config.categories, options, &store, &mut observer)?;

    let root = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
    if options.dry_run {
        OutputFormatter::dry_run_notice("No files were moved. Proposed moves:");
    }
    for record in &report.records {
        OutputFormatter::move_line(&root, record);
    }

    if report.records.is_empty() {
        OutputFormatter::plain("Nothing to organize.");
    } else {
        OutputFormatter::summary_table(&report.destination_counts(), report.records.len());
    }
    if report.already_in_place > 0 {
        OutputFormatter::plain(&format!(
            "{} files were already in place.",
            report.already_in_place
        ));
    }
    OutputFormatter::failures("SKIPPED", &report.failures);

    if !options.dry_run && !report.records.is_empty() {
        OutputFormatter::success(&format!(
            "Organization complete. Use 'tidyfold undo {}' to revert.",
            dir.display()
        ));
    }
    Ok(())
}

fn undo_organization(dir: &Path, config: &Config) -> Result<()> {
    let store = HistoryStore::from_config(dir, config);
    let report = undo_last(&store)?;

    match &report.outcome {
        UndoOutcome::Nothing => {
            OutputFormatter::warning("No previous organization found to undo.");
            return Ok(());
        }
        UndoOutcome::Undone { run_time, .. } => {
            OutputFormatter::info(&format!("Undoing run from {}", run_time.to_rfc3339()));
        }
    }

    OutputFormatter::success(&format!("Restored {} files", report.restored.len()));
    OutputFormatter::failures("NOT FOUND", &report.skipped);
    OutputFormatter::failures("FAILED", &report.failed);
    if !report.is_complete_success() {
        OutputFormatter::warning(
            "Some files could not be restored. The run was still removed from history.",
        );
    }
    Ok(())
}

fn show_duplicates(dir: &Path, config: &Config, recursive: bool) -> Result<()> {
    let report = find_duplicates(dir, recursive, &config.compile_filters()?)?;

    if report.groups.is_empty() {
        OutputFormatter::success("No duplicates found.");
    } else {
        for (digest, members) in &report.groups {
            let short = &digest[..12.min(digest.len())];
            OutputFormatter::header(&format!("{} ({} copies)", short, members.len()));
            for member in members {
                OutputFormatter::plain(&format!("  {}", member.display()));
            }
        }
        OutputFormatter::plain(&format!(
            "\n{} groups, {} files, {:.2} MB reclaimable",
            report.groups.len(),
            report.duplicate_files(),
            round_mb(report.wasted_bytes())
        ));
    }
    OutputFormatter::failures("UNREADABLE", &report.unreadable);
    Ok(())
}

fn show_stats(dir: &Path, config: &Config, recursive: bool) -> Result<()> {
    let filters = config.compile_filters()?;
    let stats = dashboard_stats(dir, &config.categories, recursive, &filters)?;

    OutputFormatter::info(&format!(
        "Total files: {}    Total size: {} MB",
        stats.total_files,
        stats.total_size_mb()
    ));
    OutputFormatter::header("BY CATEGORY");
    OutputFormatter::size_table(&stats.counts, &stats.per_category_size_bytes);

    if !stats.largest_files.is_empty() {
        OutputFormatter::header("LARGEST FILES");
        for (path, bytes) in &stats.largest_files {
            let line = format!("{:>10.2} MB  {}", round_mb(*bytes), path.display());
            OutputFormatter::plain(&line);
        }
    }

    let months = monthly_moves(&HistoryStore::from_config(dir, config).load());
    if !months.is_empty() {
        OutputFormatter::header("FILES ORGANIZED PER MONTH");
        for (month, moved) in &months {
            OutputFormatter::plain(&format!("{}  {}", month, moved));
        }
    }
    Ok(())
}

fn show_history(dir: &Path, config: &Config) {
    let store = HistoryStore::from_config(dir, config);
    let runs = store.load();
    if runs.is_empty() {
        OutputFormatter::plain(&format!("No runs recorded in {}", store.path().display()));
        return;
    }

    OutputFormatter::header("RECORDED RUNS");
    for (index, run) in runs.iter().enumerate() {
        OutputFormatter::plain(&format!(
            "{:>3}. {}  {} files  {}",
            index + 1,
            run.run_time.format("%Y-%m-%d %H:%M:%S UTC"),
            run.moves.len(),
            run.target_root.display()
        ));
    }
    OutputFormatter::plain("Only the latest run can be undone.");
}

fn verify_file(file: &Path, baseline: Option<PathBuf>, trust: bool) -> Result<()> {
    let mut baseline = IntegrityBaseline::load(baseline.unwrap_or_else(default_baseline_path));

    if trust {
        let digest = baseline.trust(file)?;
        baseline.save()?;
        OutputFormatter::success(&format!("Trusted {} ({})", file.display(), digest));
        return Ok(());
    }

    match baseline.verify(file, FirstSightPolicy::RequireConfirmation)? {
        IntegrityStatus::Unchanged => {
            OutputFormatter::success(&format!("{} is unchanged", file.display()));
        }
        IntegrityStatus::Modified { expected, actual } => {
            OutputFormatter::error(&format!("{} has been modified", file.display()));
            OutputFormatter::plain(&format!("  expected {}\n  actual   {}", expected, actual));
        }
        IntegrityStatus::Untracked { digest } => {
            OutputFormatter::warning(&format!(
                "{} is not in the baseline (digest {}). Run again with --trust to record it.",
                file.display(),
                digest
            ));
        }
    }
    Ok(())
}
