//! Remote archive access.
//!
//! Everything that talks to the remote archive lives here: the
//! [`RemoteStore`]/[`Session`] abstraction and its FTP implementation, the
//! depth-first [`TreeWalker`], the [`CredentialRouter`] that picks a login
//! for a root path, and the [`RetryPolicy`] applied to transient failures.

pub mod backend;
mod credentials;
pub mod error;
mod models;
mod path;
mod retry;
mod walk;

pub use crate::backend::{Probe, RemoteStore, Session};
pub use crate::credentials::{CredentialRouter, CredentialRule, Credentials};
pub use crate::models::RemoteEntry;
pub use crate::retry::RetryPolicy;
pub use crate::walk::{TreeWalker, walk};
use std::sync::Arc;

pub type StoreHandle = Arc<dyn RemoteStore + Send + Sync>;
pub type SessionHandle = Box<dyn Session + Send>;
