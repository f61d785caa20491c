//! Depth-first traversal of the remote tree.
//!
//! Listings don't say which names are files and which are directories, so
//! every name is probed by trying to enter it. The session's working
//! directory doubles as the traversal cursor: after a subtree is exhausted the
//! walker moves the cursor back to the parent before continuing with the
//! parent's remaining names.

use crate::backend::Probe;
use crate::error::{ErrorKind, Result};
use crate::models::RemoteEntry;
use crate::SessionHandle;
use async_stream::stream;
use futures::Stream;
use std::collections::VecDeque;
use tracing::instrument;

/// A directory on the current path from the root, with the names still to visit.
#[derive(Debug)]
struct Level {
    directory: String,
    pending: VecDeque<String>,
}

/// Pull-based depth-first walker over a remote session.
///
/// Files are yielded one at a time through [`next_entry()`](Self::next_entry),
/// which leaves the walker in between so the caller can use the same session
/// (via [`session_mut()`](Self::session_mut)) to retrieve each file before
/// asking for the next one. Retrieval doesn't move the working directory, so
/// it never disturbs the traversal.
///
/// # Examples
///
/// ```no_run
/// use ziptrawl_storage::{Credentials, RemoteStore, TreeWalker, backend::FtpStore};
///
/// # async fn example() -> ziptrawl_storage::error::Result<()> {
/// let store = FtpStore::new("ftp.zakupki.gov.ru", 21);
/// let session = store.open(&Credentials::new("free", "free")).await?;
/// let mut walker = TreeWalker::start(session, "/fcs_regions/Tatarstan_Resp/contracts").await?;
/// while let Some(entry) = walker.next_entry().await? {
///     let bytes = walker.session_mut().retrieve(&entry.path()).await?;
///     println!("{entry}: {} bytes", bytes.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct TreeWalker {
    session: SessionHandle,
    root: String,
    stack: Vec<Level>,
}
impl TreeWalker {
    /// Enters `root` and lists it.
    ///
    /// Fails with [`NotFound`](ErrorKind::NotFound) if `root` can't be
    /// entered as a directory.
    #[instrument(skip(session))]
    pub async fn start(mut session: SessionHandle, root: &str) -> Result<Self> {
        if session.change_dir(root).await? == Probe::NotADirectory {
            exn::bail!(ErrorKind::NotFound(root.to_string()));
        }
        let directory = session.current_dir().await?;
        let pending = VecDeque::from(session.list().await?);
        tracing::debug!(directory = %directory, children = pending.len(), "Walking remote tree");
        Ok(Self {
            session,
            root: directory.clone(),
            stack: vec![Level { directory, pending }],
        })
    }

    /// Absolute root directory, as reported by the server.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn session_mut(&mut self) -> &mut SessionHandle {
        &mut self.session
    }

    pub fn into_session(self) -> SessionHandle {
        self.session
    }

    /// Next file in depth-first order, or `None` once the tree is exhausted.
    ///
    /// When `None` is returned the working directory is back at the root.
    /// Any error leaves the cursor in an unknown place; the walk should be
    /// abandoned.
    pub async fn next_entry(&mut self) -> Result<Option<RemoteEntry>> {
        loop {
            let Some(level) = self.stack.last_mut() else {
                return Ok(None);
            };
            let directory = level.directory.clone();
            let Some(name) = level.pending.pop_front() else {
                self.stack.pop();
                if let Some(parent) = self.stack.last() {
                    let parent = parent.directory.clone();
                    self.restore(&parent).await?;
                }
                continue;
            };
            match self.session.change_dir(&name).await? {
                Probe::NotADirectory => return Ok(Some(RemoteEntry::new(directory, name))),
                Probe::Directory => {
                    let entered = self.session.current_dir().await?;
                    // A link back up the tree would otherwise never finish.
                    if self.stack.iter().any(|level| level.directory == entered) {
                        tracing::warn!(directory = %directory, name = %name, entered = %entered, "Skipping directory cycle");
                        self.restore(&directory).await?;
                        continue;
                    }
                    let pending = VecDeque::from(self.session.list().await?);
                    tracing::trace!(directory = %entered, children = pending.len(), "Descending");
                    self.stack.push(Level {
                        directory: entered,
                        pending,
                    });
                },
            }
        }
    }

    /// Move the cursor back to a directory already visited.
    async fn restore(&mut self, directory: &str) -> Result<()> {
        match self.session.change_dir(directory).await? {
            Probe::Directory => Ok(()),
            Probe::NotADirectory => {
                exn::bail!(ErrorKind::Protocol(format!("could not return to {directory}")))
            },
        }
    }

    /// Drain the walker as a stream of entries. The stream ends after the
    /// first error.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<RemoteEntry>> + Send {
        stream! {
            loop {
                match self.next_entry().await {
                    Ok(Some(entry)) => yield Ok(entry),
                    Ok(None) => return,
                    Err(e) => { yield Err(e); return; },
                }
            }
        }
    }
}

/// Stream every file under `root`.
///
/// Convenience wrapper over [`TreeWalker`] for callers that don't need the
/// session while walking.
pub fn walk(session: SessionHandle, root: impl Into<String>) -> impl Stream<Item = Result<RemoteEntry>> + Send {
    let root = root.into();
    stream! {
        let walker = match TreeWalker::start(session, &root).await {
            Ok(walker) => walker,
            Err(e) => { yield Err(e); return; },
        };
        for await entry in walker.into_stream() {
            yield entry;
        }
    }
}
