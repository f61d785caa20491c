use crate::error::{ErrorKind, Result};
use crate::terms::QueryTerms;
use exn::ResultExt;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Most bytes reserved up front for an entry, whatever size it declares.
const PREALLOCATE_LIMIT: usize = 1 << 20;

/// A file entry whose text contains at least one query term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Path of the entry inside the archive.
    pub name: String,
    pub content: String,
}

/// Iterator over the matching entries of an in-memory archive.
///
/// Entries are visited in archive order. An entry that can't be read or
/// decoded is yielded as an error and scanning carries on with the next one.
///
/// # Examples
///
/// ```no_run
/// use ziptrawl_archive::{ArchiveScanner, QueryTerms};
///
/// # fn example(bytes: Vec<u8>) -> ziptrawl_archive::error::Result<()> {
/// let terms: QueryTerms = "1655000000".parse()?;
/// for entry in ArchiveScanner::open(bytes, &terms)? {
///     match entry {
///         Ok(entry) => println!("{}", entry.name),
///         Err(err) => eprintln!("skipped: {err:?}"),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct ArchiveScanner<'t> {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    terms: &'t QueryTerms,
    next: usize,
}
impl<'t> ArchiveScanner<'t> {
    /// Fails with [`OpenArchive`](ErrorKind::OpenArchive) if the bytes are
    /// not a ZIP archive.
    pub fn open(bytes: Vec<u8>, terms: &'t QueryTerms) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes)).or_raise(|| ErrorKind::OpenArchive)?;
        Ok(Self {
            archive,
            terms,
            next: 0,
        })
    }

    /// Total number of entries in the archive, matching or not.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Read entry `index`, returning `None` for directories.
    fn read(&mut self, index: usize) -> Result<Option<(String, Vec<u8>)>> {
        let mut file = self
            .archive
            .by_index(index)
            .or_raise(|| ErrorKind::EntryRead(format!("#{index}")))?;
        if file.is_dir() {
            return Ok(None);
        }
        let name = file.name().to_string();
        // The declared size comes from the archive and may be forged.
        let hint = usize::try_from(file.size()).unwrap_or(usize::MAX).min(PREALLOCATE_LIMIT);
        let mut bytes = Vec::with_capacity(hint);
        file.read_to_end(&mut bytes).or_raise(|| ErrorKind::EntryRead(name.clone()))?;
        Ok(Some((name, bytes)))
    }
}

impl Iterator for ArchiveScanner<'_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.archive.len() {
            let index = self.next;
            self.next += 1;
            let (name, bytes) = match self.read(index) {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            };
            let content = match String::from_utf8(bytes).or_raise(|| ErrorKind::EntryDecode(name.clone())) {
                Ok(content) => content,
                Err(e) => return Some(Err(e)),
            };
            if self.terms.matches(&content) {
                tracing::trace!(entry = %name, "Entry matches query");
                return Some(Ok(Entry { name, content }));
            }
        }
        None
    }
}

/// Opens `bytes` and scans them for `terms`. Shorthand for [`ArchiveScanner::open`].
pub fn scan(bytes: Vec<u8>, terms: &QueryTerms) -> Result<ArchiveScanner<'_>> {
    ArchiveScanner::open(bytes, terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(data).unwrap();
            }
        }
        zip.finish().unwrap().into_inner()
    }

    /// Rewrites the ZIP64 uncompressed size of the first central directory
    /// record. The archive must have been written with `large_file(true)`.
    fn forge_declared_size(bytes: &mut [u8], size: u64) {
        let header = bytes.windows(4).position(|w| w == b"PK\x01\x02").unwrap();
        let field = |bytes: &[u8], at: usize| usize::from(u16::from_le_bytes([bytes[at], bytes[at + 1]]));
        let (name_len, extra_len) = (field(bytes, header + 28), field(bytes, header + 30));
        let mut at = header + 46 + name_len;
        let end = at + extra_len;
        while at < end {
            let (id, len) = (field(bytes, at), field(bytes, at + 2));
            if id == 0x0001 {
                bytes[at + 4..at + 12].copy_from_slice(&size.to_le_bytes());
                return;
            }
            at += 4 + len;
        }
        panic!("no ZIP64 extra field");
    }

    fn names(scanner: ArchiveScanner<'_>) -> Vec<String> {
        scanner.map(|entry| entry.unwrap().name).collect()
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let bytes = archive(&[("x.xml", &b"<a>Foo</a>"[..])]);
        let foo = QueryTerms::new(["foo"]);
        let entries: Vec<_> = scan(bytes.clone(), &foo).unwrap().map(|e| e.unwrap()).collect();
        assert_eq!(
            entries,
            vec![Entry {
                name: "x.xml".to_string(),
                content: "<a>Foo</a>".to_string()
            }]
        );
        let bar = QueryTerms::new(["bar"]);
        assert_eq!(scan(bytes, &bar).unwrap().count(), 0);
    }

    #[test]
    fn test_only_matching_entries_in_archive_order() {
        let bytes = archive(&[
            ("b.xml", &b"<inn>1655</inn>"[..]),
            ("a.xml", &b"<inn>7700</inn>"[..]),
            ("docs/", &b""[..]),
            ("docs/c.xml", &b"<kpp>1655</kpp>"[..]),
        ]);
        let terms = QueryTerms::new(["1655"]);
        let scanner = scan(bytes, &terms).unwrap();
        assert_eq!(scanner.len(), 4);
        assert_eq!(names(scanner), vec!["b.xml", "docs/c.xml"]);
    }

    #[test]
    fn test_undecodable_entry_does_not_stop_scan() {
        let bytes = archive(&[("bad.xml", &[0xff, 0xfe, b'f', b'o', b'o'][..]), ("good.xml", &b"foo"[..])]);
        let terms = QueryTerms::new(["foo"]);
        let results: Vec<_> = scan(bytes, &terms).unwrap().collect();
        assert_eq!(results.len(), 2);
        let err = results[0].as_ref().unwrap_err();
        assert_eq!(**err, ErrorKind::EntryDecode("bad.xml".to_string()));
        assert_eq!(results[1].as_ref().unwrap().name, "good.xml");
    }

    #[test]
    fn test_forged_entry_size_is_not_preallocated() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("huge.xml", SimpleFileOptions::default().large_file(true)).unwrap();
        zip.write_all(b"foo").unwrap();
        zip.start_file("good.xml", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"foo").unwrap();
        let mut bytes = zip.finish().unwrap().into_inner();
        forge_declared_size(&mut bytes, 1 << 45);

        let terms = QueryTerms::new(["foo"]);
        let results: Vec<_> = scan(bytes, &terms).unwrap().collect();
        assert_eq!(results.len(), 2);
        match &results[0] {
            Ok(entry) => assert_eq!(entry.name, "huge.xml"),
            Err(err) => assert_eq!(**err, ErrorKind::EntryRead("huge.xml".to_string())),
        }
        assert_eq!(results[1].as_ref().unwrap().name, "good.xml");
    }

    #[test]
    fn test_not_an_archive() {
        let terms = QueryTerms::new(["foo"]);
        let err = scan(b"definitely not a zip".to_vec(), &terms).err().unwrap();
        assert_eq!(*err, ErrorKind::OpenArchive);
    }

    #[test]
    fn test_empty_archive() {
        let terms = QueryTerms::new(["foo"]);
        let scanner = scan(archive(&[]), &terms).unwrap();
        assert!(scanner.is_empty());
        assert_eq!(scanner.count(), 0);
    }
}
