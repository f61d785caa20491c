//! In-memory remote store for testing.

use crate::backend::{Probe, RemoteStore, Session};
use crate::credentials::Credentials;
use crate::error::{ErrorKind, Result};
use crate::path::{join, normalize, parent};
use crate::SessionHandle;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, Clone)]
struct Tree {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    /// Directory entries that lead somewhere else, like a symlink would.
    links: BTreeMap<String, String>,
}
impl Tree {
    fn add_dir(&mut self, path: &str) {
        let mut current = Some(path.to_string());
        while let Some(dir) = current {
            current = parent(&dir).map(str::to_string);
            self.dirs.insert(dir);
        }
    }

    fn children(&self, directory: &str) -> BTreeSet<String> {
        let files = self.files.keys();
        let dirs = self.dirs.iter().filter(|dir| dir.as_str() != "/");
        files
            .chain(dirs)
            .chain(self.links.keys())
            .filter(|path| parent(path) == Some(directory))
            .map(|path| crate::path::file_name(path).to_string())
            .collect()
    }
}

#[derive(Debug, Default)]
struct Counters {
    opens: AtomicUsize,
    retrieves: AtomicUsize,
    failing_opens: AtomicUsize,
    failing_retrieves: AtomicUsize,
    logins: Mutex<Vec<String>>,
}

/// Take one unit from a fault budget, returning whether there was one.
fn take(budget: &AtomicUsize) -> bool {
    budget.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
}

/// In-memory remote store.
///
/// Holds a fixed tree of directories and files. Cloning is cheap and clones
/// share the same counters, so a test can keep one copy to inspect after
/// handing another to the code under test.
#[derive(Debug, Clone)]
pub struct MockStore {
    name: String,
    tree: Arc<Tree>,
    /// Only this login is accepted, if set.
    credentials: Option<Credentials>,
    counters: Arc<Counters>,
}
impl Default for MockStore {
    fn default() -> Self {
        let mut tree = Tree::default();
        tree.add_dir("/");
        Self {
            name: "mock".to_string(),
            tree: Arc::new(tree),
            credentials: None,
            counters: Arc::default(),
        }
    }
}
impl MockStore {
    /// Create a store pre-populated with files, keyed by absolute path.
    /// Parent directories are created implicitly.
    ///
    /// Panics on an invalid path: a broken fixture should fail the test
    /// loudly rather than produce a misleading tree.
    pub fn with_files<P, D>(files: impl IntoIterator<Item = (P, D)>) -> Self
    where
        P: AsRef<str>,
        D: Into<Vec<u8>>,
    {
        Self::default().add_files(files)
    }

    pub fn add_files<P, D>(mut self, files: impl IntoIterator<Item = (P, D)>) -> Self
    where
        P: AsRef<str>,
        D: Into<Vec<u8>>,
    {
        let tree = Arc::make_mut(&mut self.tree);
        for (path, data) in files {
            let path = Self::fixture_path(path.as_ref());
            if let Some(directory) = parent(&path) {
                tree.add_dir(directory);
            }
            tree.files.insert(path, data.into());
        }
        self
    }

    /// Add (possibly empty) directories.
    pub fn with_dirs<P: AsRef<str>>(mut self, dirs: impl IntoIterator<Item = P>) -> Self {
        let tree = Arc::make_mut(&mut self.tree);
        for dir in dirs {
            tree.add_dir(&Self::fixture_path(dir.as_ref()));
        }
        self
    }

    /// Add a directory entry at `path` that, when entered, lands in `target`.
    pub fn with_link(mut self, path: &str, target: &str) -> Self {
        let (path, target) = (Self::fixture_path(path), Self::fixture_path(target));
        let tree = Arc::make_mut(&mut self.tree);
        if let Some(directory) = parent(&path) {
            tree.add_dir(directory);
        }
        tree.links.insert(path, target);
        self
    }

    /// Refuse every login except this one.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Make the next `count` calls to `open` fail with a retryable error.
    pub fn fail_opens(self, count: usize) -> Self {
        self.counters.failing_opens.store(count, Ordering::SeqCst);
        self
    }

    /// Make the next `count` calls to `retrieve` fail with a retryable error.
    pub fn fail_retrieves(self, count: usize) -> Self {
        self.counters.failing_retrieves.store(count, Ordering::SeqCst);
        self
    }

    /// Number of sessions opened so far, including failed attempts.
    pub fn opens(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }

    /// Number of file retrievals so far, including failed attempts.
    pub fn retrieves(&self) -> usize {
        self.counters.retrieves.load(Ordering::SeqCst)
    }

    /// Users that successfully logged in, in order.
    pub fn logins(&self) -> Vec<String> {
        self.counters.logins.lock().map(|logins| logins.clone()).unwrap_or_default()
    }

    fn fixture_path(path: &str) -> String {
        match normalize(path) {
            Ok(path) => path,
            Err(_) => panic!("MockStore: invalid fixture path {path:?}"),
        }
    }
}

#[async_trait]
impl RemoteStore for MockStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self, credentials: &Credentials) -> Result<SessionHandle> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        if take(&self.counters.failing_opens) {
            exn::bail!(ErrorKind::Network(format!("{}: connection reset", self.name)));
        }
        if let Some(expected) = &self.credentials
            && expected != credentials
        {
            exn::bail!(ErrorKind::PermissionDenied(format!("login refused for {}", credentials.user)));
        }
        if let Ok(mut logins) = self.counters.logins.lock() {
            logins.push(credentials.user.clone());
        }
        Ok(Box::new(MockSession {
            tree: Arc::clone(&self.tree),
            counters: Arc::clone(&self.counters),
            cwd: "/".to_string(),
        }))
    }
}

struct MockSession {
    tree: Arc<Tree>,
    counters: Arc<Counters>,
    cwd: String,
}
impl MockSession {
    fn resolve(&self, path: &str) -> Result<String> {
        normalize(join(&self.cwd, path))
    }
}

#[async_trait]
impl Session for MockSession {
    async fn change_dir(&mut self, path: &str) -> Result<Probe> {
        let resolved = self.resolve(path)?;
        if let Some(target) = self.tree.links.get(&resolved) {
            self.cwd = target.clone();
            return Ok(Probe::Directory);
        }
        if self.tree.dirs.contains(&resolved) {
            self.cwd = resolved;
            return Ok(Probe::Directory);
        }
        // Like a real server: files and missing paths are refused alike.
        Ok(Probe::NotADirectory)
    }

    async fn current_dir(&mut self) -> Result<String> {
        Ok(self.cwd.clone())
    }

    async fn list(&mut self) -> Result<Vec<String>> {
        Ok(self.tree.children(&self.cwd).into_iter().collect())
    }

    async fn retrieve(&mut self, path: &str) -> Result<Vec<u8>> {
        self.counters.retrieves.fetch_add(1, Ordering::SeqCst);
        let resolved = self.resolve(path)?;
        if take(&self.counters.failing_retrieves) {
            exn::bail!(ErrorKind::Timeout(format!("RETR {resolved}")));
        }
        match self.tree.files.get(&resolved) {
            Some(data) => Ok(data.clone()),
            None => exn::bail!(ErrorKind::NotFound(resolved)),
        }
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
