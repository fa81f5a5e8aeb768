//! Safe access to the publication's ZIP container.
//!
//! Entry names are indexed twice, case-exact and lowercased, so lookups can
//! fall back to a case-insensitive match. Reads are bounded by a configured
//! decompression limit and entry names are validated against path traversal
//! before any bytes are produced.

use crate::errors::{Error, Result};
use crate::util::uri;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

/// Default per-entry decompression bound: 256 MiB.
pub(crate) const DEFAULT_MAX_ENTRY_SIZE: u64 = 256 * 1024 * 1024;

pub(crate) trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// An entry in the container: its case-preserving name and the
/// decompressed size declared by the ZIP header.
pub(crate) struct Entry {
    pub(crate) name: String,
    pub(crate) declared_size: u64,
}

/// The container index plus the (closeable) reader behind it.
///
/// The reader lives behind a `RefCell` so that reads can be served through
/// shared references; the index outlives [`close`](Archive::close) so that
/// cached lookups keep working on a closed book.
pub(crate) struct Archive {
    zip: RefCell<Option<ZipArchive<Box<dyn ReadSeek>>>>,
    entries: Vec<Entry>,
    exact: HashMap<String, usize>,
    lower: HashMap<String, usize>,
    limit: u64,
}

impl Archive {
    pub(crate) fn new(reader: Box<dyn ReadSeek>, limit: u64) -> Result<Self> {
        let mut zip = ZipArchive::new(reader)?;
        let mut entries = Vec::with_capacity(zip.len());
        let mut exact = HashMap::with_capacity(zip.len());
        let mut lower = HashMap::with_capacity(zip.len());

        for index in 0..zip.len() {
            let file = zip.by_index_raw(index)?;
            let name = file.name().to_owned();

            // First insertion wins on either kind of collision.
            exact.entry(name.clone()).or_insert(index);
            lower.entry(name.to_lowercase()).or_insert(index);
            entries.push(Entry {
                name,
                declared_size: file.size(),
            });
        }

        Ok(Self {
            zip: RefCell::new(Some(zip)),
            entries,
            exact,
            lower,
            limit,
        })
    }

    pub(crate) fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Looks up an entry by name, preferring a case-exact match and
    /// falling back to a case-insensitive one.
    pub(crate) fn find(&self, name: &str) -> Option<usize> {
        self.exact
            .get(name)
            .or_else(|| self.lower.get(&name.to_lowercase()))
            .copied()
    }

    /// Reads an entry by name.
    ///
    /// # Errors
    /// [`EntryNotFound`](Error::EntryNotFound) when no entry matches;
    /// otherwise as [`Self::read_index`].
    pub(crate) fn read(&self, name: &str) -> Result<Vec<u8>> {
        match self.find(name) {
            Some(index) => self.read_index(index),
            None => Err(Error::EntryNotFound(name.to_owned())),
        }
    }

    /// Reads the entry at `index`, enforcing path safety and the
    /// decompression limit.
    ///
    /// The declared size is checked first, then at most `limit + 1` bytes
    /// are pulled from the decompression stream so a forged header cannot
    /// smuggle a larger payload past the bound.
    pub(crate) fn read_index(&self, index: usize) -> Result<Vec<u8>> {
        let entry = &self.entries[index];

        if !uri::is_safe(&entry.name) {
            return Err(Error::UnsafePath(entry.name.clone()));
        }
        if entry.declared_size > self.limit {
            return Err(Error::EntryTooLarge {
                name: entry.name.clone(),
                limit: self.limit,
            });
        }

        let mut guard = self.zip.borrow_mut();
        let zip = guard.as_mut().ok_or(Error::Closed)?;

        let file = zip.by_index(index)?;
        let mut data = Vec::new();
        file.take(self.limit.saturating_add(1)).read_to_end(&mut data)?;

        if data.len() as u64 > self.limit {
            return Err(Error::EntryTooLarge {
                name: entry.name.clone(),
                limit: self.limit,
            });
        }
        Ok(data)
    }

    /// Drops the underlying reader. Idempotent; the entry index survives.
    pub(crate) fn close(&self) {
        self.zip.borrow_mut().take();
    }
}

/// Strips a leading UTF-8 byte-order mark from a text buffer.
pub(crate) fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data)
}
