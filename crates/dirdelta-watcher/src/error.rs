//! Error types for scanning and change detection.

use dirdelta_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience type for watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Things that can go wrong while watching a directory.
#[derive(Error, Debug)]
pub enum WatchError {
    /// Couldn't read the watched root.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The watched root does not exist.
    #[error("path not found: '{0}'")]
    PathNotFound(PathBuf),

    /// `get_changes` needs a baseline from `attach` first.
    #[error("watcher is not attached; call attach() before get_changes()")]
    NotAttached,

    /// The name filter is not a valid glob.
    #[error("invalid filter pattern: {0}")]
    InvalidPattern(String),

    /// The in-memory index rejected an operation.
    #[error(transparent)]
    Storage(#[from] CoreError),
}

impl WatchError {
    /// Creates an IO error with the path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
