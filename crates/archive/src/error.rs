//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The bytes are not a readable ZIP archive. Skip the whole archive.
    #[display("not a readable archive")]
    OpenArchive,
    /// An entry could not be decompressed. Skip the entry, keep scanning.
    #[display("failed to read entry {_0}")]
    EntryRead(#[error(not(source))] String),
    /// An entry is not valid UTF-8 text. Skip the entry, keep scanning.
    #[display("entry {_0} is not UTF-8 text")]
    EntryDecode(#[error(not(source))] String),
    /// No usable query terms were supplied.
    #[display("no query terms given")]
    EmptyQuery,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Archives are already in memory; the same bytes fail the same way.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::OpenArchive.to_string(), "not a readable archive");
        assert_eq!(ErrorKind::EntryDecode("a.xml".to_string()).to_string(), "entry a.xml is not UTF-8 text");
    }
}
