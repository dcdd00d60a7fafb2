//! Error types for simdex.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while chunking, indexing, or querying.
#[derive(Debug, Error)]
pub enum Error {
    /// Source file cannot be opened or read.
    #[error("source unavailable: {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A shard or metadata file cannot be created, read, or written.
    #[error("shard I/O at {}: {source}", .path.display())]
    ShardIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A shard or metadata file exists but cannot be decoded
    /// (bad magic bytes, version mismatch, truncated payload).
    #[error("shard decode at {}: {reason}", .path.display())]
    ShardDecode { path: PathBuf, reason: String },

    /// Invalid parameter value (e.g. band count not dividing the hash width).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invariant violation. Fatal; not retryable.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn input(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Input {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn shard_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ShardIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn shard_decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ShardDecode {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for simdex operations.
pub type Result<T> = std::result::Result<T, Error>;
