//! Date handling for archive filenames.
//!
//! Archive bundles embed the interval they cover in their filename, as in
//! `2018010100_2018020100_001.xml.zip`.
//! This crate parses those intervals ([`FileInterval`]), parses the user's
//! query range ([`DateRange`]) and decides whether a file is worth fetching
//! ([`DateRangeFilter`]).

mod consts;
pub mod error;
mod filter;
mod interval;
mod range;

pub use crate::filter::{DateRangeFilter, matches};
pub use crate::interval::{FileInterval, overlaps};
pub use crate::range::{DateRange, parse_date};
pub use time::Date;
