//! Executes sort plans against the filesystem and reverses them.
//!
//! A [`Mover`] owns the single history slot for its root. `execute` replaces
//! that history with the moves it manages to perform; `revert` walks the
//! history back, removes the folders the sort created once they are empty,
//! and clears it.

use crate::error::{Error, Result};
use crate::history::{MoveRecord, OperationHistory};
use crate::planner::SortPlan;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Outcome of a revert.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RevertReport {
    /// Files moved back to where they came from.
    pub restored: usize,
    /// Records whose target no longer exists.
    pub skipped: Vec<PathBuf>,
    /// Records that could not be moved back, with the reason.
    pub failed: Vec<(PathBuf, String)>,
    /// Folders removed because the revert left them empty.
    pub removed_dirs: usize,
}

impl RevertReport {
    pub fn total_processed(&self) -> usize {
        self.restored + self.skipped.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Moves files for one root and remembers what it moved.
#[derive(Debug)]
pub struct Mover {
    root: PathBuf,
    history: OperationHistory,
}

impl Mover {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            history: OperationHistory::new(root.clone()),
            root,
        }
    }

    /// Resumes from a history produced earlier, e.g. one loaded from disk.
    pub fn with_history(history: OperationHistory) -> Self {
        Self {
            root: history.root.clone(),
            history,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn history(&self) -> &OperationHistory {
        &self.history
    }

    /// Executes `plan` in order.
    ///
    /// For each entry the target folders are created as needed and the file is
    /// moved there, replacing any file already at the target. The previous
    /// history is discarded up front. On the first failure the run stops and
    /// the error is returned; the history then holds exactly the moves that
    /// succeeded, so a partial run can still be reverted.
    pub fn execute(&mut self, plan: &SortPlan) -> Result<&OperationHistory> {
        if !self.root.is_dir() {
            return Err(Error::InvalidBasePath {
                path: self.root.clone(),
                reason: "not a directory".to_string(),
            });
        }
        if plan.root != self.root {
            return Err(Error::InvalidBasePath {
                path: plan.root.clone(),
                reason: format!("plan was made for another root than {}", self.root.display()),
            });
        }

        self.history = OperationHistory::new(self.root.clone());

        for entry in &plan.entries {
            let source = entry.source(&self.root);
            let target_dir = entry.target_dir(&self.root);
            let target = target_dir.join(&entry.target_name);

            if let Err(e) = fs::create_dir_all(&target_dir) {
                error!(dir = %target_dir.display(), error = %e, "could not create target folder");
                return Err(Error::DirectoryCreationFailed {
                    path: target_dir,
                    source: e,
                });
            }

            if let Err(e) = fs::rename(&source, &target) {
                error!(
                    source = %source.display(),
                    target = %target.display(),
                    error = %e,
                    "move failed, stopping run"
                );
                return Err(Error::MoveFailed {
                    source_path: source,
                    target_path: target,
                    source: e,
                });
            }

            debug!(source = %source.display(), target = %target.display(), "moved");
            self.history.push(MoveRecord { source, target });
        }

        info!(root = %self.root.display(), moved = self.history.len(), "sort complete");
        Ok(&self.history)
    }

    /// Moves every recorded file back, newest first, then clears the history.
    ///
    /// A record whose target is gone is skipped. A record that cannot be moved
    /// back is reported and the others are still attempted. A file sitting at
    /// the original location is replaced. Reverting with an empty history does
    /// nothing.
    pub fn revert(&mut self) -> RevertReport {
        let mut report = RevertReport::default();
        if self.history.is_empty() {
            return report;
        }

        for record in self.history.records.iter().rev() {
            if !record.target.exists() {
                warn!(target = %record.target.display(), "moved file is gone, skipping");
                report.skipped.push(record.target.clone());
                continue;
            }

            if let Some(parent) = record.source.parent()
                && let Err(e) = fs::create_dir_all(parent)
            {
                report
                    .failed
                    .push((record.target.clone(), format!("Could not recreate {}: {}", parent.display(), e)));
                continue;
            }

            match fs::rename(&record.target, &record.source) {
                Ok(()) => {
                    debug!(target = %record.target.display(), source = %record.source.display(), "restored");
                    report.restored += 1;
                }
                Err(e) => {
                    warn!(target = %record.target.display(), error = %e, "could not restore");
                    report
                        .failed
                        .push((record.target.clone(), format!("Failed to restore file: {}", e)));
                }
            }
        }

        let parents: BTreeSet<PathBuf> = self
            .history
            .records
            .iter()
            .filter_map(|r| r.target.parent().map(Path::to_path_buf))
            .collect();
        report.removed_dirs = parents
            .iter()
            .map(|dir| prune_empty_dirs(dir, &self.root))
            .sum();

        info!(
            root = %self.root.display(),
            restored = report.restored,
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "revert complete"
        );

        self.history = OperationHistory::new(self.root.clone());
        report
    }
}

/// Deletes `dir` if it is empty, then its parent, and so on, stopping at the
/// first non-empty folder or at `root`, which is never deleted. I/O errors end
/// the walk quietly. Returns the number of folders removed.
fn prune_empty_dirs(dir: &Path, root: &Path) -> usize {
    let mut removed = 0;
    let mut current = Some(dir);

    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        let is_empty = match fs::read_dir(dir) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => break,
        };
        if !is_empty || fs::remove_dir(dir).is_err() {
            break;
        }
        removed += 1;
        current = dir.parent();
    }

    removed
}
