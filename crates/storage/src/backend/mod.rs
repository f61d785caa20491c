//! Remote store trait and implementations.
//!
//! This module defines the [`RemoteStore`] and [`Session`] traits, which
//! provide a unified interface to hierarchical remote archives (FTP in
//! production, an in-memory tree in tests).
//!

mod ftp;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::ftp::FtpStore;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockStore;
use crate::SessionHandle;
use crate::credentials::Credentials;
use crate::error::Result;
use async_trait::async_trait;

/// Outcome of trying to enter a remote path as a directory.
///
/// The remote protocol does not reliably say whether a listed name is a file
/// or a directory, so the walker asks the server to change into it. A refusal
/// is [`NotADirectory`](Self::NotADirectory); a transport failure is an
/// error, never a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The working directory is now the requested path.
    Directory,
    /// The server refused to enter the path; the working directory is unchanged.
    NotADirectory,
}

/// Something that hands out authenticated [`Session`]s.
///
/// # Examples
///
/// ```no_run
/// use ziptrawl_storage::{Credentials, RemoteStore, backend::FtpStore};
///
/// # async fn example() -> ziptrawl_storage::error::Result<()> {
/// let store = FtpStore::new("ftp.zakupki.gov.ru", 21);
/// let mut session = store.open(&Credentials::new("free", "free")).await?;
/// session.change_dir("/fcs_regions").await?;
/// println!("{:?}", session.list().await?);
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Name of the store, used for logging only.
    fn name(&self) -> &str;

    /// Connect and authenticate.
    ///
    /// Returns [`PermissionDenied`](crate::error::ErrorKind::PermissionDenied)
    /// when the login is refused, and a retryable error when the server could
    /// not be reached.
    async fn open(&self, credentials: &Credentials) -> Result<SessionHandle>;
}

/// A single authenticated connection with a working-directory cursor.
///
/// Sessions are used strictly sequentially: one call completes before the
/// next one starts.
#[async_trait]
pub trait Session: Send {
    /// Change the working directory.
    ///
    /// `path` may be absolute, or relative to the current working directory.
    /// On [`Probe::NotADirectory`] the working directory is left unchanged.
    async fn change_dir(&mut self, path: &str) -> Result<Probe>;

    /// Absolute path of the working directory, as reported by the server.
    async fn current_dir(&mut self) -> Result<String>;

    /// Bare names of the immediate children of the working directory.
    ///
    /// Files and directories are not distinguished. An empty directory
    /// yields an empty list, not an error.
    async fn list(&mut self) -> Result<Vec<String>>;

    /// Full binary contents of a file.
    ///
    /// Does not move the working directory. Returns
    /// [`NotFound`](crate::error::ErrorKind::NotFound) if the file does not
    /// exist.
    async fn retrieve(&mut self, path: &str) -> Result<Vec<u8>>;

    /// Politely end the session. Dropping a session without closing it is
    /// allowed; the connection is still released.
    async fn close(&mut self) -> Result<()>;
}
