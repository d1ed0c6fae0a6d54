/// Record of the moves performed by the most recent sort run.
///
/// The history lives with the [`Mover`](crate::mover::Mover) that produced it
/// and can be written next to the sorted files, so a later process can undo
/// the run.
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Name of the history file kept inside a sorted root.
pub const HISTORY_FILE_NAME: &str = ".metasort_history.json";

/// A single move: where the file was, and where it went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub source: PathBuf,
    pub target: PathBuf,
}

/// The moves of one sort run, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationHistory {
    /// RFC 3339 timestamp of the run.
    pub timestamp: String,
    /// The root directory that was sorted.
    pub root: PathBuf,
    pub records: Vec<MoveRecord>,
}

impl OperationHistory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            root: root.into(),
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: MoveRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn file_path(root: &Path) -> PathBuf {
        root.join(HISTORY_FILE_NAME)
    }

    /// Writes this history to `<root>/.metasort_history.json`.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::HistoryWriteFailed {
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

        fs::write(Self::file_path(&self.root), json)
            .map_err(|e| Error::HistoryWriteFailed { source: e })
    }

    /// Loads the history saved in `root`.
    ///
    /// Returns [`Error::NoHistory`] when nothing was saved. A file recorded for
    /// another root, or with a source or target outside `root`, is rejected.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::file_path(root);
        if !path.exists() {
            return Err(Error::NoHistory {
                path: root.to_path_buf(),
            });
        }

        let json = fs::read_to_string(&path).map_err(|e| Error::HistoryReadFailed { source: e })?;
        let history: Self = serde_json::from_str(&json).map_err(|e| Error::InvalidHistoryFormat {
            reason: e.to_string(),
        })?;

        if history.root != root {
            return Err(Error::InvalidHistoryFormat {
                reason: format!(
                    "history was recorded for {}, not {}",
                    history.root.display(),
                    root.display()
                ),
            });
        }

        let stray = history
            .records
            .iter()
            .flat_map(|r| [&r.source, &r.target])
            .find(|path| !lies_under(path, root));
        if let Some(stray) = stray {
            return Err(Error::InvalidHistoryFormat {
                reason: format!("{} is outside {}", stray.display(), root.display()),
            });
        }

        Ok(history)
    }

    /// Removes the saved history of `root`, if any.
    pub fn delete(root: &Path) -> Result<()> {
        let path = Self::file_path(root);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| Error::HistoryWriteFailed { source: e })?;
        }
        Ok(())
    }
}

/// True if `path` is strictly below `root` and never steps back up.
fn lies_under(path: &Path, root: &Path) -> bool {
    path != root
        && path.starts_with(root)
        && !path.components().any(|c| c == Component::ParentDir)
}
