//! Storage models.

use crate::path::join;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A file located during a walk of the remote tree.
///
/// `directory` is the absolute working directory the server reported when
/// the file was listed; `name` is the bare file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteEntry {
    pub directory: String,
    pub name: String,
}
impl RemoteEntry {
    pub fn new(directory: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
        }
    }

    /// Absolute path of the file on the remote server.
    pub fn path(&self) -> String {
        join(&self.directory, &self.name)
    }
}
impl Display for RemoteEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.path())
    }
}
