//! The ziptrawl search pipeline.
//!
//! Composes the other crates into a single lazy search: walk the remote tree
//! from a root, drop files whose names fall outside the date range, serve the
//! rest from the [cache](ziptrawl_cache) or the [remote store](ziptrawl_storage),
//! and scan each archive for the query terms. The primary entry point is
//! [`Pipeline::run`], which streams [`Event`]s.

pub mod error;
mod event;
mod pipeline;
mod query;

pub use crate::event::{Event, Match, Stats};
pub use crate::pipeline::Pipeline;
pub use crate::query::{Query, Roots, parse_dates, parse_root, parse_terms};
