//! Error types shared by the scan, plan, move and undo stages.

use crate::config::ConfigError;
use std::path::PathBuf;

/// Errors that can occur while sorting a directory or undoing a sort.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The root directory could not be listed. Fatal to scanning and planning.
    #[error("Failed to list directory {}: {source}", path.display())]
    ListingFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The root directory path is invalid or doesn't exist.
    #[error("Invalid base path {}: {reason}", path.display())]
    InvalidBasePath { path: PathBuf, reason: String },

    /// Metadata could not be extracted from a single file.
    #[error("Could not extract metadata from {}: {reason}", path.display())]
    ExtractionFailed { path: PathBuf, reason: String },

    /// The requested sort levels are unusable.
    #[error("Invalid sort levels: {reason}")]
    InvalidLevels { reason: String },

    /// Failed to create a target folder.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to move a file to its target. Stops the remaining plan.
    #[error("Failed to move {} to {}: {source}", source_path.display(), target_path.display())]
    MoveFailed {
        source_path: PathBuf,
        target_path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the history file.
    #[error("Failed to write history file: {source}")]
    HistoryWriteFailed { source: std::io::Error },

    /// Failed to read the history file.
    #[error("Failed to read history file: {source}")]
    HistoryReadFailed { source: std::io::Error },

    /// The history file exists but cannot be understood.
    #[error("Invalid history file format: {reason}")]
    InvalidHistoryFormat { reason: String },

    /// There is no previous sort to undo.
    #[error("No previous sort found to undo in {}", path.display())]
    NoHistory { path: PathBuf },

    /// A background task ended without reporting back.
    #[error("Background {task} task panicked")]
    TaskPanicked { task: &'static str },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for metasort operations.
pub type Result<T> = std::result::Result<T, Error>;
