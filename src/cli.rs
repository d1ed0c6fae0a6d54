//! Command-line interface for metasort.
//!
//! Three commands share one workflow:
//! - `rank` scans a directory and lists the attributes worth sorting by
//! - `sort` scans, plans and moves files into nested folders (or previews them)
//! - `undo` moves the files of the last sort back and removes emptied folders

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extractor::ContentExtractor;
use crate::history::OperationHistory;
use crate::output::OutputFormatter;
use crate::planner::{ExtensionFilter, SortLevels};
use crate::ranking::Blacklist;
use crate::session::SortSession;
use crate::store::ScanReport;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

/// Sort a flat directory into nested folders built from file metadata.
#[derive(Debug, Parser)]
#[command(name = "metasort", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./.metasortrc.toml, then ~/.config/metasort/config.toml).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: SortCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum SortCommand {
    /// List attributes by how many files in DIR carry them.
    Rank {
        dir: PathBuf,

        /// Attribute-prefix blacklist (overrides the configured one).
        #[arg(long, value_name = "FILE")]
        blacklist: Option<PathBuf>,

        /// Show at most N attributes.
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Move files in DIR into folders named after their attribute values.
    Sort {
        dir: PathBuf,

        /// Attribute for one folder level, outermost first. Repeat for deeper levels.
        #[arg(short, long = "level", value_name = "ATTRIBUTE", required = true)]
        levels: Vec<String>,

        /// Only sort files with these extensions, e.g. "mp3,flac".
        #[arg(short, long = "ext", value_name = "EXT", value_delimiter = ',')]
        extensions: Vec<String>,

        /// Show the resulting folder tree without moving anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Undo the last sort of DIR.
    Undo { dir: PathBuf },
}

/// Runs one command.
///
/// ```no_run
/// use metasort::cli::{run_cli, SortCommand};
/// use std::path::PathBuf;
///
/// let command = SortCommand::Undo { dir: PathBuf::from("/path/to/music") };
/// if let Err(e) = run_cli(command, None) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(command: SortCommand, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    match command {
        SortCommand::Rank {
            dir,
            blacklist,
            limit,
        } => {
            let blacklist_path = blacklist.unwrap_or_else(|| config.ranking.blacklist.clone());
            rank_directory(&dir, &config, &blacklist_path, limit)
        }
        SortCommand::Sort {
            dir,
            levels,
            extensions,
            dry_run,
        } => {
            let levels = SortLevels::new(levels)?;
            let filter = ExtensionFilter::parse(&extensions.join(","));
            sort_directory(&dir, &config, &levels, &filter, dry_run)
        }
        SortCommand::Undo { dir } => undo_sort(&dir),
    }
}

fn resolve_root(dir: &Path) -> Result<PathBuf> {
    let root = fs::canonicalize(dir).map_err(|e| Error::InvalidBasePath {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !root.is_dir() {
        return Err(Error::InvalidBasePath {
            path: dir.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    Ok(root)
}

/// Builds a session for `dir` and fills its store with the built-in extractor.
fn scanned_session(dir: &Path, config: &Config) -> Result<SortSession> {
    let root = resolve_root(dir)?;
    OutputFormatter::info(&format!("Scanning {}", root.display()));

    let mut session = SortSession::new(root, config.compile_filters()?);
    let progress = OutputFormatter::create_progress_bar();
    let report = session.scan(&ContentExtractor::default(), Some(&progress));
    progress.finish_and_clear();

    report_scan(&report?);
    Ok(session)
}

fn report_scan(report: &ScanReport) {
    OutputFormatter::success(&format!("Read metadata from {} file(s)", report.extracted));
    if !report.failed.is_empty() {
        OutputFormatter::warning(&format!(
            "{} file(s) could not be read and will be left alone:",
            report.failed.len()
        ));
        for (path, reason) in &report.failed {
            println!("    - {}: {}", path.display(), reason);
        }
    }
}

fn rank_directory(
    dir: &Path,
    config: &Config,
    blacklist_path: &Path,
    limit: Option<usize>,
) -> Result<()> {
    let session = scanned_session(dir, config)?;
    let blacklist = Blacklist::load(blacklist_path);
    let ranking = session.rank(&blacklist);

    if ranking.is_empty() {
        OutputFormatter::warning("No attributes found.");
        return Ok(());
    }

    OutputFormatter::ranking_table(&ranking, session.store().len(), limit);
    Ok(())
}

fn sort_directory(
    dir: &Path,
    config: &Config,
    levels: &SortLevels,
    filter: &ExtensionFilter,
    dry_run: bool,
) -> Result<()> {
    let mut session = scanned_session(dir, config)?;

    let known = session.rank(&Blacklist::default());
    for level in levels.iter() {
        if !known.iter().any(|attr| attr.name == level) {
            OutputFormatter::warning(&format!(
                "No file has '{}'; every file will go to Unknown_{}",
                level, level
            ));
        }
    }

    let plan = session.plan(levels, filter)?;
    if plan.is_empty() {
        OutputFormatter::warning("No files to sort.");
        return Ok(());
    }

    if dry_run {
        OutputFormatter::header("PREVIEW");
        OutputFormatter::plan_tree(&session.root().display().to_string(), &plan.tree());
        OutputFormatter::dry_run_notice(&format!(
            "{} file(s) would be moved. Run again without --dry-run to apply.",
            plan.len()
        ));
        return Ok(());
    }

    let outcome = session.execute(&plan).map(|history| history.len());
    let history = session.history();
    if let Err(e) = history.save() {
        OutputFormatter::warning(&format!("Could not save history, undo will not be available: {}", e));
    }

    match outcome {
        Ok(moved) => {
            OutputFormatter::success(&format!("Sorted {} file(s).", moved));
            OutputFormatter::info(&format!(
                "Use 'metasort undo {}' to revert.",
                session.root().display()
            ));
            Ok(())
        }
        Err(e) => {
            OutputFormatter::error(&format!(
                "Sort stopped after {} of {} file(s).",
                history.len(),
                plan.len()
            ));
            if !history.is_empty() {
                OutputFormatter::warning(&format!(
                    "Partially applied. 'metasort undo {}' reverts what was moved.",
                    session.root().display()
                ));
            }
            Err(e)
        }
    }
}

fn undo_sort(dir: &Path) -> Result<()> {
    let root = resolve_root(dir)?;
    OutputFormatter::info(&format!("Undoing last sort of {}", root.display()));

    let history = OperationHistory::load(&root)?;
    let mut session = SortSession::with_history(history, Default::default());
    let report = session.revert();

    // the history is spent even when some records could not be restored
    OperationHistory::delete(&root)?;

    OutputFormatter::revert_report(&report);
    Ok(())
}
