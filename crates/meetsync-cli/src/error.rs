//! Sync error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that end a run.
///
/// Per-user fetch failures and per-task push failures are not errors at
/// this level; they are counted in the run summary.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration is missing, unreadable or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// No user's calendar could be read because the source itself is down
    /// or refuses the credentials.
    #[error("calendar source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Tracing(#[from] meetsync_core::TracingError),
}

impl SyncError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
