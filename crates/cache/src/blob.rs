//! Blob files inside the cache directory.

use crate::error::{ErrorKind, Result};
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const TEMP_SUFFIX: &str = ".tmp";

/// Flat directory of blobs named by opaque identifiers.
///
/// A blob only appears under its final name once it has been written and
/// flushed in full, so a crash mid-write never leaves a truncated blob behind
/// a valid name.
#[derive(Debug, Clone)]
pub(crate) struct BlobStore {
    root: PathBuf,
}
impl BlobStore {
    /// Creates the directory if it doesn't exist yet.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidDirectory(root));
            }
        } else {
            // Only happens once when the cache is opened; not worth going async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { root })
    }

    pub fn path(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// The temporary file is removed again if any step fails.
    pub async fn write(&self, id: &str, data: &[u8]) -> Result<()> {
        let path = self.path(id);
        let temp = self.root.join(format!("{id}{TEMP_SUFFIX}"));
        let written = match Self::write_file(&temp, data).await {
            Ok(()) => fs::rename(&temp, &path).await.map_err(|e| Self::map_io_error(e, &path)),
            Err(e) => Err(Self::map_io_error(e, &temp)),
        };
        if written.is_err() {
            match fs::remove_file(&temp).await {
                Ok(()) => {},
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
                Err(e) => tracing::warn!(path = %temp.display(), error = %e, "Could not remove temporary blob"),
            }
        }
        Ok(written?)
    }

    async fn write_file(temp: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(temp).await?;
        file.write_all(data).await?;
        file.sync_all().await
    }

    /// Returns `None` if the blob doesn't exist.
    pub async fn read(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(id);
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::map_io_error(e, &path).into()),
        }
    }

    /// Returns `false` if there was nothing to delete.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let path = self.path(id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::map_io_error(e, &path).into()),
        }
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }
}
