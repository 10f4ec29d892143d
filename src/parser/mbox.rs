//! Streaming MBOX segmenter.
//!
//! Reads the archive line-by-line through a buffered reader and yields one
//! [`RawMessage`] per `From ` envelope, with the exact byte range it
//! occupies. Only the message being assembled is kept in memory.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{MboxError, Result};

/// Default size of the internal read buffer (1 MB).
pub const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Marker that opens every message in the archive.
pub const FROM_MARKER: &[u8; 5] = b"From ";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// One message cut out of the archive.
///
/// `bytes` is exactly the content of `[start, end)` in the file, envelope
/// line included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub start: u64,
    pub end: u64,
    pub bytes: Vec<u8>,
}

/// Splits an MBOX file into messages.
///
/// The segmenter itself holds no open file: every call to [`iter`](Self::iter)
/// opens the archive again and starts from byte 0.
pub struct MboxSegmenter {
    path: PathBuf,
    file_size: u64,
    buffer_size: usize,
}

impl MboxSegmenter {
    /// Create a segmenter for the given archive.
    ///
    /// Verifies that the file exists and is readable, but does NOT validate
    /// that it is actually an MBOX.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| MboxError::open(&path, e))?;
        Ok(Self {
            path,
            file_size: metadata.len(),
            buffer_size: READ_BUFFER_SIZE,
        })
    }

    /// Override the read buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(4096);
        self
    }

    /// Total size of the underlying file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Path to the archive.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start a fresh pass over the archive.
    pub fn iter(&self) -> Result<Segments> {
        let file = File::open(&self.path).map_err(|e| MboxError::open(&self.path, e))?;
        Ok(Segments {
            path: self.path.clone(),
            reader: BufReader::with_capacity(self.buffer_size, file),
            position: 0,
            current: None,
            line_buf: Vec::with_capacity(4096),
            preamble: 0,
            done: false,
        })
    }

    /// Read a single message given its byte range.
    ///
    /// Uses `seek` to jump directly to the message without scanning the file.
    pub fn read_message_at(path: impl AsRef<Path>, start: u64, end: u64) -> Result<Vec<u8>> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| MboxError::open(path, e))?;
        read_range(&mut file, path, start, end)
    }
}

/// Seek to `start` on an open archive and read exactly `end - start` bytes.
pub(crate) fn read_range(file: &mut File, path: &Path, start: u64, end: u64) -> Result<Vec<u8>> {
    let expected = end.saturating_sub(start);
    file.seek(SeekFrom::Start(start))
        .map_err(|e| MboxError::io(path, e))?;

    let mut buffer = Vec::with_capacity(expected as usize);
    let actual = file
        .by_ref()
        .take(expected)
        .read_to_end(&mut buffer)
        .map_err(|e| MboxError::io(path, e))? as u64;

    if actual < expected {
        return Err(MboxError::Truncated {
            path: path.to_path_buf(),
            offset: start,
            expected,
            actual,
        });
    }
    Ok(buffer)
}

/// Message currently being accumulated.
struct Pending {
    start: u64,
    bytes: Vec<u8>,
}

/// Lazy iterator over the messages of an archive, in file order.
pub struct Segments {
    path: PathBuf,
    reader: BufReader<File>,
    position: u64,
    current: Option<Pending>,
    line_buf: Vec<u8>,
    preamble: u64,
    done: bool,
}

impl Segments {
    /// Read the next line into `line_buf`. Returns its length (0 at EOF).
    fn read_line(&mut self) -> Result<usize> {
        self.line_buf.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.line_buf)
            .map_err(|e| MboxError::io(&self.path, e))?;
        self.position += n as u64;
        Ok(n)
    }

    fn finish(&mut self) -> Option<RawMessage> {
        self.done = true;
        if self.preamble > 0 {
            warn!(
                bytes = self.preamble,
                path = %self.path.display(),
                "Ignored data before the first 'From ' line"
            );
        }
        self.current.take().map(|pending| RawMessage {
            start: pending.start,
            end: self.position,
            bytes: pending.bytes,
        })
    }
}

impl Iterator for Segments {
    type Item = Result<RawMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let line_len = match self.read_line() {
                Ok(0) => return self.finish().map(Ok),
                Ok(n) => n as u64,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            let line_start = self.position - line_len;
            let line = if line_start == 0 {
                strip_bom(&self.line_buf)
            } else {
                self.line_buf.as_slice()
            };
            if is_mbox_separator(line) {
                let opened = Pending {
                    start: line_start,
                    bytes: self.line_buf.clone(),
                };
                if let Some(closed) = self.current.replace(opened) {
                    debug!(start = closed.start, end = line_start, "Message boundary");
                    return Some(Ok(RawMessage {
                        start: closed.start,
                        end: line_start,
                        bytes: closed.bytes,
                    }));
                }
            } else if let Some(pending) = self.current.as_mut() {
                pending.bytes.extend_from_slice(&self.line_buf);
            } else {
                self.preamble += line_len;
            }
        }
    }
}

/// Check whether a line is an MBOX separator (`From ` at the start).
pub fn is_mbox_separator(line: &[u8]) -> bool {
    line.starts_with(FROM_MARKER)
}

/// Drop a leading UTF-8 byte order mark.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}
