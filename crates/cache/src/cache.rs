use crate::Database;
use crate::blob::BlobStore;
use crate::error::{ErrorKind, Result};
use crate::models::{CacheRecord, EntryRow};
use exn::ResultExt;
use sqlx::SqliteConnection;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tracing::instrument;
use uuid::Uuid;

/// Name of the index file inside the cache directory.
pub const INDEX_FILE: &str = "index.sqlite3";

/// Key to blob store with insertion-order eviction.
///
/// Every [`store()`](Self::store) and [`load()`](Self::load) runs as one
/// index transaction; the index connection is exclusive, so transactions
/// never interleave, even when the cache is shared between tasks.
///
/// # Examples
///
/// ```no_run
/// use ziptrawl_cache::ContentCache;
///
/// # async fn example() -> ziptrawl_cache::error::Result<()> {
/// let cache = ContentCache::open("/tmp/ziptrawl", 20).await?;
/// cache.store("/out/nsi/a.xml.zip", b"PK...").await?;
/// assert_eq!(cache.load("/out/nsi/a.xml.zip").await?.as_deref(), Some(&b"PK..."[..]));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ContentCache {
    dir: PathBuf,
    capacity: usize,
    db: Database,
    blobs: BlobStore,
}

impl ContentCache {
    /// Opens (or creates) the cache in `dir`, holding at most `capacity` keys.
    ///
    /// A capacity smaller than the number of keys already indexed is allowed;
    /// the surplus is evicted by the next store.
    #[instrument]
    pub async fn open(dir: impl AsRef<Path> + std::fmt::Debug, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            exn::bail!(ErrorKind::InvalidCapacity);
        }
        let dir = dir.as_ref().to_path_buf();
        let blobs = BlobStore::new(&dir)?;
        let db = Database::connect(dir.join(INDEX_FILE)).await?;
        Ok(Self {
            dir,
            capacity,
            db,
            blobs,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stores `bytes` under `key`, replacing any previous value.
    ///
    /// The blob is written before the index is touched and removed again if
    /// the index can't be updated. Returns the records evicted to get back
    /// within capacity, oldest first.
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub async fn store(&self, key: &str, bytes: &[u8]) -> Result<Vec<CacheRecord>> {
        let blob_id = Uuid::new_v4().simple().to_string();
        self.blobs.write(&blob_id, bytes).await?;
        let (replaced, evicted) = match self.index(key, &blob_id).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if let Err(cleanup) = self.blobs.delete(&blob_id).await {
                    tracing::warn!(blob = %blob_id, error = %*cleanup, "Could not remove orphaned blob");
                }
                return Err(err);
            },
        };
        if let Some(replaced) = replaced {
            tracing::debug!(blob = %replaced, "Replacing cached blob");
            self.discard_blob(&replaced).await;
        }
        for record in &evicted {
            tracing::debug!(key = %record.key, blob = %record.blob_id, "Evicting cached archive");
            self.discard_blob(&record.blob_id).await;
        }
        tracing::debug!(blob = %blob_id, evicted = evicted.len(), "Stored archive in cache");
        Ok(evicted)
    }

    /// Upsert `key` and evict down to capacity in one transaction. Returns the
    /// blob the key pointed at before, and the evicted records.
    async fn index(&self, key: &str, blob_id: &str) -> Result<(Option<String>, Vec<CacheRecord>)> {
        let mut tx = self.db.pool().begin().await.or_raise(|| ErrorKind::Database)?;
        let previous = get_entry(&mut *tx, key).await?;
        let last: Option<i64> = sqlx::query_scalar(include_str!("../queries/last_inserted_at.sql"))
            .fetch_one(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        // Clocks can stall or step backwards; insertion order must not.
        let inserted_at = match last {
            Some(last) => now_nanos()?.max(last.saturating_add(1)),
            None => now_nanos()?,
        };
        sqlx::query(include_str!("../queries/upsert_entry.sql"))
            .bind(key)
            .bind(inserted_at)
            .bind(blob_id)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let capacity = i64::try_from(self.capacity).or_raise(|| ErrorKind::InvalidData("capacity"))?;
        let mut evicted = Vec::new();
        while count_entries(&mut *tx).await? > capacity {
            let Some(oldest) = oldest_entry(&mut *tx).await? else {
                break;
            };
            sqlx::query(include_str!("../queries/delete_entry.sql"))
                .bind(&oldest.key)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
            evicted.push(CacheRecord::try_from(oldest)?);
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        let replaced = previous.map(|row| row.blob_id).filter(|previous| previous != blob_id);
        Ok((replaced, evicted))
    }

    /// Returns the bytes stored under `key`, or `None` if the key is unknown
    /// or its blob has gone missing. Never changes the key's age.
    #[instrument(skip(self))]
    pub async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut tx = self.db.pool().begin().await.or_raise(|| ErrorKind::Database)?;
        let bytes = match get_entry(&mut *tx, key).await? {
            Some(entry) => {
                let bytes = self.blobs.read(&entry.blob_id).await?;
                if bytes.is_none() {
                    tracing::warn!(blob = %entry.blob_id, "Cached blob is missing, treating as a miss");
                }
                bytes
            },
            None => None,
        };
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        tracing::debug!(hit = bytes.is_some(), "Cache lookup");
        Ok(bytes)
    }

    /// Number of indexed keys.
    pub async fn len(&self) -> Result<usize> {
        let mut conn = self.db.pool().acquire().await.or_raise(|| ErrorKind::Database)?;
        let count = count_entries(&mut *conn).await?;
        usize::try_from(count).or_raise(|| ErrorKind::InvalidData("entry count"))
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// All indexed records, oldest first.
    pub async fn records(&self) -> Result<Vec<CacheRecord>> {
        let rows: Vec<EntryRow> = sqlx::query_as(include_str!("../queries/list_entries.sql"))
            .fetch_all(self.db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(CacheRecord::try_from).collect()
    }

    /// Removes every record and its blob. Returns the number of records removed.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<usize> {
        let mut tx = self.db.pool().begin().await.or_raise(|| ErrorKind::Database)?;
        let rows: Vec<EntryRow> = sqlx::query_as(include_str!("../queries/delete_all_entries.sql"))
            .fetch_all(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        for row in &rows {
            self.discard_blob(&row.blob_id).await;
        }
        tracing::info!(removed = rows.len(), "Cleared cache");
        Ok(rows.len())
    }

    pub async fn close(&self) {
        self.db.close().await;
    }

    /// Delete a blob that the index no longer refers to. The index is
    /// already committed, so failures are only worth a warning.
    async fn discard_blob(&self, blob_id: &str) {
        match self.blobs.delete(blob_id).await {
            Ok(true) => {},
            Ok(false) => tracing::debug!(blob = %blob_id, "Blob already gone"),
            Err(err) => tracing::warn!(blob = %blob_id, error = %*err, "Could not delete blob"),
        }
    }
}

fn now_nanos() -> Result<i64> {
    i64::try_from(UtcDateTime::now().unix_timestamp_nanos()).or_raise(|| ErrorKind::InvalidData("current time"))
}

async fn get_entry(conn: &mut SqliteConnection, key: &str) -> Result<Option<EntryRow>> {
    sqlx::query_as(include_str!("../queries/get_entry.sql"))
        .bind(key)
        .fetch_optional(conn)
        .await
        .or_raise(|| ErrorKind::Database)
}

async fn oldest_entry(conn: &mut SqliteConnection) -> Result<Option<EntryRow>> {
    sqlx::query_as(include_str!("../queries/oldest_entry.sql"))
        .fetch_optional(conn)
        .await
        .or_raise(|| ErrorKind::Database)
}

async fn count_entries(conn: &mut SqliteConnection) -> Result<i64> {
    sqlx::query_scalar(include_str!("../queries/count_entries.sql"))
        .fetch_one(conn)
        .await
        .or_raise(|| ErrorKind::Database)
}
