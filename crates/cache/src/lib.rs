//! Durable, capacity-bounded disk cache for fetched archives.
//!
//! The cache directory holds one SQLite index file and a flat set of blob
//! files named by random identifiers. The index maps a key (the remote path of
//! an archive) to the blob holding its bytes, along with the time the key was
//! stored. When the index grows past its capacity the oldest stored keys are
//! evicted; reading a key never changes its age.
//!
//! The index is the source of truth: a blob without an index entry is never
//! returned, and an index entry whose blob has gone missing reads as a miss.

mod blob;
mod cache;
mod db;
pub mod error;
mod models;

pub use crate::cache::{ContentCache, INDEX_FILE};
pub use crate::db::Database;
pub use crate::models::CacheRecord;
