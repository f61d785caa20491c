use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use time::UtcDateTime;

/// One entry of the cache index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    /// Absolute remote path of the cached archive.
    pub key: String,
    pub inserted_at: UtcDateTime,
    /// Name of the blob file holding the archive bytes.
    pub blob_id: String,
}

#[derive(sqlx::FromRow)]
pub(crate) struct EntryRow {
    pub key: String,
    pub inserted_at: i64,
    pub blob_id: String,
}
impl TryFrom<EntryRow> for CacheRecord {
    type Error = Error;
    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            key: row.key,
            inserted_at: UtcDateTime::from_unix_timestamp_nanos(i128::from(row.inserted_at))
                .or_raise(|| ErrorKind::InvalidData("insertion time"))?,
            blob_id: row.blob_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_to_record() {
        let row = EntryRow {
            key: "/out/a.xml.zip".to_string(),
            inserted_at: 1_500_000_000_123_456_789,
            blob_id: "0f3c".to_string(),
        };
        let record = CacheRecord::try_from(row).unwrap();
        assert_eq!(record.key, "/out/a.xml.zip");
        assert_eq!(record.inserted_at.unix_timestamp(), 1_500_000_000);
        assert_eq!(record.inserted_at.nanosecond(), 123_456_789);
        assert_eq!(record.blob_id, "0f3c");
    }
}
