//! Error types for addrsync.
//!
//! Library crates use [`AddrSyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` and decides when the process exits.

use std::path::PathBuf;

/// Top-level error type for all addrsync operations.
#[derive(Debug, thiserror::Error)]
pub enum AddrSyncError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A store could not be reached or rejected the credentials.
    #[error("connection error: {0}")]
    Connection(String),

    /// A query failed to execute.
    #[error("query error: {0}")]
    Query(String),

    /// Malformed document, malformed snapshot JSON, or a bad identifier.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The destination store refused the write.
    #[error("insert error: {0}")]
    Insert(String),

    /// Data validation error (missing snapshot, invalid argument, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AddrSyncError>;

impl AddrSyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a decode error from any displayable message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
