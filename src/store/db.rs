//! SQLite index store: message records plus an FTS5 mirror.
//!
//! ```text
//! messages                         messages_fts (FTS5, contentless)
//! ┌────────────────────────────┐   ┌──────────────────────────────┐
//! │ id            INTEGER PK   │◄──│ rowid                        │
//! │ message_id    TEXT UNIQUE  │   │ sender, subject, body        │
//! │ sender, subject, date TEXT │   └──────────────────────────────┘
//! │ start_offset, end_offset   │
//! └────────────────────────────┘
//! ```
//!
//! Rows are only ever inserted. A record and its full-text entry are
//! written inside one savepoint, so either both exist or neither does.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row, Savepoint, Transaction};
use tracing::{debug, info};

use crate::error::{MboxError, Result};
use crate::model::mail::{MessageRecord, NewMessage, SearchHit};
use crate::search::sanitize_query;

/// Current schema version, stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY,
    message_id TEXT NOT NULL UNIQUE,
    sender TEXT NOT NULL,
    subject TEXT NOT NULL,
    date TEXT NOT NULL,
    start_offset INTEGER NOT NULL,
    end_offset INTEGER NOT NULL,
    CHECK (start_offset < end_offset)
);

CREATE INDEX IF NOT EXISTS idx_messages_date ON messages(date DESC);

CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts USING fts5(
    sender,
    subject,
    body,
    content=''
);
"#;

/// Outcome of inserting one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was created with this id.
    Inserted(i64),
    /// A record with the same `message_id` already exists; nothing was written.
    Duplicate,
}

/// Aggregate numbers over the stored records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Coverage {
    pub records: u64,
    pub first_offset: u64,
    pub last_offset: u64,
    pub indexed_bytes: u64,
}

/// Handle on an index database file.
pub struct IndexStore {
    path: PathBuf,
    conn: Connection,
}

impl IndexStore {
    /// Open the store for writing, creating the file and schema if needed.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let existed = path.exists();
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        if !existed {
            info!(path = %path.display(), "Created index store");
        }
        Ok(Self { path, conn })
    }

    /// Open an existing store without write access.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(MboxError::IndexNotFound(path));
        }
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let has_schema: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'messages'",
            [],
            |row| row.get(0),
        )?;
        if !has_schema {
            return Err(MboxError::IndexNotFound(path));
        }
        debug!(path = %path.display(), "Opened index store read-only");
        Ok(Self { path, conn })
    }

    /// Private in-memory store.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start a write transaction. Uncommitted work is rolled back on drop.
    pub fn writer(&mut self) -> Result<IndexWriter<'_>> {
        Ok(IndexWriter {
            tx: self.conn.transaction()?,
        })
    }

    /// Number of message records.
    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Number of full-text entries.
    pub fn fulltext_count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM messages_fts", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Find messages whose sender, subject or body contain `term` as a
    /// literal phrase, newest `date` first.
    ///
    /// Dates are compared as raw header strings, so the order is only
    /// roughly chronological.
    pub fn search(&self, term: &str) -> Result<Vec<SearchHit>> {
        let query = sanitize_query(term)?;
        debug!(term, query = %query, "Full-text search");

        let mut stmt = self.conn.prepare_cached(
            "SELECT id, sender, subject, date FROM messages
             WHERE id IN (SELECT rowid FROM messages_fts WHERE messages_fts MATCH ?1)
             ORDER BY date DESC, id ASC",
        )?;
        let hits = stmt
            .query_map(params![query], |row| {
                Ok(SearchHit {
                    id: row.get(0)?,
                    sender: row.get(1)?,
                    subject: row.get(2)?,
                    date: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(hits)
    }

    /// Look up a full record by id.
    pub fn record(&self, id: i64) -> Result<Option<MessageRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, message_id, sender, subject, date, start_offset, end_offset
                 FROM messages WHERE id = ?1",
                params![id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Byte range `[start, end)` of a record.
    pub fn offsets(&self, id: i64) -> Result<Option<(u64, u64)>> {
        let range = self
            .conn
            .query_row(
                "SELECT start_offset, end_offset FROM messages WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, i64>(1)? as u64)),
            )
            .optional()?;
        Ok(range)
    }

    /// Totals used by `stats`.
    pub fn coverage(&self) -> Result<Coverage> {
        let coverage = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(MIN(start_offset), 0), COALESCE(MAX(end_offset), 0),
                    COALESCE(SUM(end_offset - start_offset), 0)
             FROM messages",
            [],
            |row| {
                Ok(Coverage {
                    records: row.get::<_, i64>(0)? as u64,
                    first_offset: row.get::<_, i64>(1)? as u64,
                    last_offset: row.get::<_, i64>(2)? as u64,
                    indexed_bytes: row.get::<_, i64>(3)? as u64,
                })
            },
        )?;
        Ok(coverage)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<MessageRecord> {
    Ok(MessageRecord {
        id: row.get(0)?,
        message_id: row.get(1)?,
        sender: row.get(2)?,
        subject: row.get(3)?,
        date: row.get(4)?,
        start_offset: row.get::<_, i64>(5)? as u64,
        end_offset: row.get::<_, i64>(6)? as u64,
    })
}

/// Open write transaction on the store.
pub struct IndexWriter<'a> {
    tx: Transaction<'a>,
}

impl IndexWriter<'_> {
    /// Insert a record and, only if it is new, its full-text entry.
    ///
    /// A duplicate `message_id` leaves the store untouched: the first
    /// occurrence wins.
    pub fn insert(&mut self, msg: &NewMessage) -> Result<InsertOutcome> {
        if msg.start_offset >= msg.end_offset {
            return Err(MboxError::ParseError {
                offset: msg.start_offset,
                reason: format!("empty byte range ending at {}", msg.end_offset),
            });
        }
        let sp = self.tx.savepoint()?;
        let outcome = insert_in(&sp, msg)?;
        sp.commit()?;
        Ok(outcome)
    }

    /// Make every insert of this run durable.
    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

fn insert_in(sp: &Savepoint<'_>, msg: &NewMessage) -> Result<InsertOutcome> {
    let added = sp.execute(
        "INSERT OR IGNORE INTO messages
            (message_id, sender, subject, date, start_offset, end_offset)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            msg.message_id,
            msg.sender,
            msg.subject,
            msg.date,
            msg.start_offset as i64,
            msg.end_offset as i64,
        ],
    )?;
    if added == 0 {
        return Ok(InsertOutcome::Duplicate);
    }

    let id = sp.last_insert_rowid();
    sp.execute(
        "INSERT INTO messages_fts (rowid, sender, subject, body) VALUES (?1, ?2, ?3, ?4)",
        params![id, msg.sender, msg.subject, msg.body],
    )?;
    Ok(InsertOutcome::Inserted(id))
}
