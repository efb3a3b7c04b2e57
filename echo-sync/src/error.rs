//! Echo sync error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for sync operations.
pub type EchoResult<T> = Result<T, EchoError>;

/// Errors that can occur while talking to the note queue or writing notes.
#[derive(Debug, Error)]
pub enum EchoError {
    /// No response was received (connection refused, DNS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{operation} failed with HTTP status {status}")]
    Api { operation: String, status: u16 },

    #[error("local store error: {0}")]
    LocalStore(#[from] LocalStoreError),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("a sync pass is already in progress")]
    SyncInProgress,

    #[error("sync scheduler is not running")]
    SchedulerStopped,
}

impl EchoError {
    pub(crate) fn api(operation: impl Into<String>, status: reqwest::StatusCode) -> Self {
        EchoError::Api {
            operation: operation.into(),
            status: status.as_u16(),
        }
    }

    /// Returns the HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            EchoError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the server rejected a claim because another
    /// claim already exists.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}

/// Errors raised by the local note store.
#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
