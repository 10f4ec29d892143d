//! Archive reader: pulls single messages out of the MBOX by byte range,
//! with an LRU cache of decoded results.

use std::fs::File;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;
use tracing::debug;

use crate::error::{MboxError, Result};
use crate::model::mail::MessageRecord;
use crate::parser::mbox::read_range;
use crate::parser::mime::{self, DecodedMessage};

/// Default number of decoded messages to keep in the LRU cache.
pub const DEFAULT_CACHE_SIZE: usize = 50;

/// Random-access reader over the original archive.
///
/// The archive is opened once, read-only, and closed when the reader is
/// dropped.
pub struct ArchiveReader {
    path: PathBuf,
    file: File,
    cache: LruCache<i64, DecodedMessage>,
}

impl ArchiveReader {
    /// Open an MBOX file for random-access reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_cache_size(path, DEFAULT_CACHE_SIZE)
    }

    pub fn with_cache_size(path: impl AsRef<Path>, cache_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| MboxError::open(&path, e))?;
        let cache_size = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            path,
            file,
            cache: LruCache::new(cache_size),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the exact bytes of `[start, end)`.
    pub fn read_range(&mut self, start: u64, end: u64) -> Result<Vec<u8>> {
        debug!(start, end, "Reading message from MBOX");
        read_range(&mut self.file, &self.path, start, end)
    }

    /// Read the raw bytes of an indexed message (not cached).
    pub fn raw_message(&mut self, record: &MessageRecord) -> Result<Vec<u8>> {
        self.read_range(record.start_offset, record.end_offset)
    }

    /// Read and decode a message. Cached results are returned immediately.
    pub fn decoded_message(&mut self, record: &MessageRecord) -> Result<&DecodedMessage> {
        if !self.cache.contains(&record.id) {
            let raw = self.raw_message(record)?;
            let decoded = mime::decode_message(&raw, record.start_offset)?;
            self.cache.put(record.id, decoded);
        }
        self.cache
            .get(&record.id)
            .ok_or(MboxError::MessageNotFound(record.id))
    }
}
