//! Date Error Types

use derive_more::{Display, Error};

/// A date parsing error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for date operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A value could not be understood; ask the user again.
    #[display("failed to parse {field}, found value: {value}")]
    ParseError {
        /// What was being parsed.
        field: &'static str,
        /// The offending input.
        value: String,
    },
    /// Both ends were given but the range ends before it starts.
    #[display("date range ends ({to}) before it starts ({from})")]
    ReversedRange {
        from: String,
        to: String,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // User input doesn't get any better by being parsed twice.
        false
    }
}
