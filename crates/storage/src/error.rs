//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Remote file or directory does not exist
    #[display("remote path not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Login refused by the remote server
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// Connection dropped, refused, or the server asked us to come back later
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// A remote call did not answer within the configured timeout
    #[display("timed out: {_0}")]
    Timeout(#[error(not(source))] String),
    /// The server answered something we don't know how to handle
    #[display("protocol error: {_0}")]
    Protocol(#[error(not(source))] String),
    /// Remote path is not absolute, or escapes the root
    #[display("invalid remote path: {_0}")]
    InvalidPath(#[error(not(source))] String),
    /// None of the configured credential rules apply to the root path
    #[display("no credential rule matches {_0}")]
    NoCredentialRule(#[error(not(source))] String),
    /// A credential rule pattern is not a valid regular expression
    #[display("invalid credential pattern: {_0}")]
    InvalidPattern(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}
