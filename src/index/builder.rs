//! Index construction: segment the archive, decode each message and write
//! records plus full-text entries to the store.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::mail::NewMessage;
use crate::parser::mbox::{MboxSegmenter, RawMessage, READ_BUFFER_SIZE};
use crate::parser::mime;
use crate::store::db::{IndexStore, IndexWriter, InsertOutcome};

/// Tuning knobs for an indexing run.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Buffer size for the sequential archive read.
    pub read_buffer_size: usize,
    /// Log a progress line every this many messages (0 disables it).
    pub progress_interval: u64,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            read_buffer_size: READ_BUFFER_SIZE,
            progress_interval: 1000,
        }
    }
}

/// Snapshot handed to the progress callback after every message.
#[derive(Debug, Clone, Copy)]
pub struct IndexProgress {
    pub bytes_read: u64,
    pub file_size: u64,
    pub processed: u64,
}

/// What an indexing run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexSummary {
    pub store_path: PathBuf,
    /// Every message the segmenter produced.
    pub processed: u64,
    /// New records written.
    pub inserted: u64,
    /// Messages whose `message_id` was already indexed.
    pub duplicates: u64,
    /// Messages skipped because they could not be decoded or stored.
    pub failed: u64,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Index `mbox_path` into the store at `store_path`.
///
/// The archive is checked and opened before the store is touched, so a
/// missing archive never leaves a half-created store behind. Failures on a
/// single message are logged and counted; an I/O error while streaming the
/// archive aborts the run and rolls back everything written by it.
pub fn build_index(
    mbox_path: &Path,
    store_path: &Path,
    options: &IndexOptions,
    progress: Option<&dyn Fn(&IndexProgress)>,
) -> Result<IndexSummary> {
    let start = Instant::now();
    let segmenter = MboxSegmenter::new(mbox_path)?.with_buffer_size(options.read_buffer_size);
    let segments = segmenter.iter()?;
    let file_size = segmenter.file_size();

    info!(
        archive = %mbox_path.display(),
        store = %store_path.display(),
        file_size,
        "Building index"
    );

    let mut store = IndexStore::create(store_path)?;
    let mut writer = store.writer()?;
    let mut summary = IndexSummary {
        store_path: store_path.to_path_buf(),
        ..Default::default()
    };

    for raw in segments {
        let raw = raw?;
        summary.processed += 1;

        match index_message(&mut writer, &raw) {
            Ok(InsertOutcome::Inserted(id)) => {
                debug!(id, start = raw.start, "Indexed message");
                summary.inserted += 1;
            }
            Ok(InsertOutcome::Duplicate) => {
                debug!(start = raw.start, "Duplicate Message-ID, skipped");
                summary.duplicates += 1;
            }
            Err(e) => {
                warn!(offset = raw.start, error = %e, "Could not index message");
                summary.failed += 1;
            }
        }

        if options.progress_interval > 0 && summary.processed % options.progress_interval == 0 {
            info!(processed = summary.processed, "Indexing progress");
        }
        if let Some(cb) = progress {
            cb(&IndexProgress {
                bytes_read: raw.end,
                file_size,
                processed: summary.processed,
            });
        }
    }

    writer.commit()?;
    summary.elapsed = start.elapsed();

    info!(
        processed = summary.processed,
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        failed = summary.failed,
        "Index complete"
    );
    Ok(summary)
}

/// Decode one message and store it.
fn index_message(writer: &mut IndexWriter<'_>, raw: &RawMessage) -> Result<InsertOutcome> {
    let decoded = mime::decode_message(&raw.bytes, raw.start)?;
    let message = NewMessage::from_decoded(&decoded, raw.start, raw.end);
    writer.insert(&message)
}

/// Path of the index store for an archive: the extension is replaced by
/// `-index.db`.
///
/// Example: `/data/mail.mbox` → `/data/mail-index.db`
pub fn index_path_for(mbox_path: &Path) -> PathBuf {
    let stem = mbox_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mbox".to_string());
    mbox_path.with_file_name(format!("{stem}-index.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_path_replaces_extension() {
        assert_eq!(
            index_path_for(Path::new("/data/mail.mbox")),
            PathBuf::from("/data/mail-index.db")
        );
        assert_eq!(
            index_path_for(Path::new("archive")),
            PathBuf::from("archive-index.db")
        );
        assert_eq!(
            index_path_for(Path::new("dir/all.tar.mbox")),
            PathBuf::from("dir/all.tar-index.db")
        );
    }

    #[test]
    fn test_index_path_is_deterministic() {
        let p = Path::new("/x/y/Takeout.mbox");
        assert_eq!(index_path_for(p), index_path_for(p));
    }

    #[test]
    fn test_hidden_file_keeps_name() {
        assert_eq!(
            index_path_for(Path::new("/x/.mbox")),
            PathBuf::from("/x/.mbox-index.db")
        );
    }
}
