//! Centralized error types for mboxdex.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mboxdex library.
#[derive(Error, Debug)]
pub enum MboxError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The archive file does not exist.
    #[error("MBOX file not found: {0}")]
    FileNotFound(PathBuf),

    /// No index store exists next to the archive yet.
    #[error("Index not found at '{0}'")]
    IndexNotFound(PathBuf),

    /// The index store rejected an operation.
    #[error("Index store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// No record with this id exists in the index.
    #[error("Message #{0} not found in index")]
    MessageNotFound(i64),

    /// A single message could not be decoded.
    #[error("Parse error at offset {offset}: {reason}")]
    ParseError { offset: u64, reason: String },

    /// The archive is shorter than the indexed byte range.
    #[error(
        "'{path}' is truncated: expected {expected} bytes at offset {offset}, found {actual}"
    )]
    Truncated {
        path: PathBuf,
        offset: u64,
        expected: u64,
        actual: u64,
    },

    /// The search term cannot be turned into a query.
    #[error("Invalid search query: {0}")]
    InvalidQuery(String),
}

/// Convenience alias for `Result<T, MboxError>`.
pub type Result<T> = std::result::Result<T, MboxError>;

impl MboxError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Map an open failure to `FileNotFound` or `Io`.
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path)
        } else {
            Self::io(path, source)
        }
    }
}
