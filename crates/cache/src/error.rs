//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// The cache directory (or a blob in it) is not accessible.
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// The cache directory path exists but is not a directory.
    #[display("not a cache directory: {}", _0.display())]
    InvalidDirectory(#[error(not(source))] PathBuf),
    #[display("I/O error: {_0}")]
    Io(std::io::Error),
    /// A cache must be able to hold at least one archive.
    #[display("cache capacity must be at least 1")]
    InvalidCapacity,
    /// The index holds a value that can't be converted back.
    #[display("invalid cache data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A local disk that fails once tends to fail again.
        false
    }
}
