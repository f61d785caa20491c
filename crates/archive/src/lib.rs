//! In-memory ZIP scanning.
//!
//! Archives are opened straight from the bytes the cache hands over; nothing
//! is written to disk. Each file entry is decoded as UTF-8 and reported if
//! its text contains at least one of the query terms, ignoring case.

pub mod error;
mod scanner;
mod terms;

pub use crate::scanner::{ArchiveScanner, Entry, scan};
pub use crate::terms::QueryTerms;
