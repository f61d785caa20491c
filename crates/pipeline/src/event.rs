use std::fmt::{Display, Formatter, Result as FmtResult};

/// An archive entry that contains at least one query term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Full remote path of the archive.
    pub path: String,
    /// Path of the entry inside the archive.
    pub entry: String,
    pub content: String,
}

/// Counters accumulated over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Remote files discovered by the walk.
    pub visited: u64,
    /// Files excluded by the date filter.
    pub filtered: u64,
    pub cache_hits: u64,
    /// Files retrieved from the remote store.
    pub fetched: u64,
    pub matches: u64,
}

impl Display for Stats {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{} visited, {} filtered out, {} cached, {} fetched, {} matches",
            self.visited, self.filtered, self.cache_hits, self.fetched, self.matches
        )
    }
}

/// Events emitted by [`Pipeline::run`](crate::Pipeline::run).
///
/// Events follow depth-first traversal order:
/// 1. [`Match`](Self::Match), [`ArchiveSkipped`](Self::ArchiveSkipped) and
///    [`EntrySkipped`](Self::EntrySkipped), zero or more times, interleaved.
/// 2. [`Finished`](Self::Finished), exactly once, signalling the stream is
///    finished.
///
/// A fatal error terminates the stream early, in which case
/// [`Finished`](Self::Finished) is never emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Match(Match),
    /// The file could not be opened as an archive; the walk carries on.
    ArchiveSkipped { path: String, reason: String },
    /// One entry could not be read or decoded; the rest of the archive is
    /// still scanned.
    EntrySkipped { path: String, entry: String, reason: String },
    Finished(Stats),
}
