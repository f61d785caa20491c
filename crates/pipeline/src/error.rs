//! Pipeline Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Errors raised by the other crates are
//! kept as children of these.

use derive_more::{Display, Error};

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No credential rule covers the root; nothing was contacted.
    #[display("no credentials configured for {_0}")]
    Credentials(#[error(not(source))] String),
    /// The remote session could not be established.
    #[display("could not connect to {_0}")]
    Connect(#[error(not(source))] String),
    /// Traversal of the remote tree failed part way.
    #[display("failed to walk {_0}")]
    Walk(#[error(not(source))] String),
    /// A remote file could not be retrieved, even after retrying.
    #[display("failed to fetch {_0}")]
    Fetch(#[error(not(source))] String),
    /// The local cache failed to read or record an archive.
    #[display("cache failure for {_0}")]
    Cache(#[error(not(source))] String),
    /// The root is neither a configured alias nor an absolute path.
    #[display("unknown root {_0:?}: expected an alias or an absolute path")]
    InvalidRoot(#[error(not(source))] String),
    #[display("invalid date range {_0:?}")]
    InvalidDates(#[error(not(source))] String),
    #[display("no query terms given")]
    InvalidTerms,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Remote calls have already been through the retry policy by the
        // time one of these is raised.
        false
    }
}
