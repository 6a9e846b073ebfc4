//! Error types shared by the organizer engine, the history ledger and undo.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while organizing or restoring files.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// Failed to create a category or quarantine directory.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to relocate a file.
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    /// The file vanished or its metadata could not be read.
    #[error("Cannot access {}: {source}", path.display())]
    InaccessibleFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The base directory path is invalid or doesn't exist.
    #[error("Invalid base path {}: {source}", path.display())]
    InvalidBasePath {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the history file.
    #[error("Failed to write history file: {source}")]
    HistoryWriteFailed { source: std::io::Error },

    /// The filesystem watcher could not be started.
    #[error("Failed to watch {}: {source}", path.display())]
    WatchFailed {
        path: PathBuf,
        source: notify::Error,
    },
}

/// Result type for organizer operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;
