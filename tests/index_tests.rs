//! Integration tests for segmentation, indexing and retrieval.

use std::path::{Path, PathBuf};

use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

use mboxdex::error::MboxError;
use mboxdex::index::{build_index, index_path_for, IndexOptions};
use mboxdex::model::mail::{NO_SENDER, NO_SUBJECT};
use mboxdex::parser::mbox::MboxSegmenter;
use mboxdex::store::{ArchiveReader, IndexStore};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Copy the fixture into a temp dir so the store lands there too.
fn temp_fixture(temp: &TempDir) -> PathBuf {
    let archive = temp.child("simple.mbox");
    archive.write_file(&fixture("simple.mbox")).unwrap();
    archive.path().to_path_buf()
}

fn index(archive: &Path) -> mboxdex::index::IndexSummary {
    build_index(archive, &index_path_for(archive), &IndexOptions::default(), None).unwrap()
}

// ─── Segmentation ───────────────────────────────────────────────────

#[test]
fn test_fixture_has_five_contiguous_messages() {
    let path = fixture("simple.mbox");
    let segmenter = MboxSegmenter::new(&path).unwrap();
    let messages: Vec<_> = segmenter.iter().unwrap().map(Result::unwrap).collect();

    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0].start, 0);
    for pair in messages.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
    }
    assert_eq!(messages[4].end, segmenter.file_size());
    assert!(messages.iter().all(|m| m.bytes.starts_with(b"From ")));
}

#[test]
fn test_escaped_from_line_does_not_split() {
    let path = fixture("simple.mbox");
    let segmenter = MboxSegmenter::new(&path).unwrap();
    let last = segmenter.iter().unwrap().last().unwrap().unwrap();
    assert!(String::from_utf8_lossy(&last.bytes).contains(">From the archive"));
}

#[test]
fn test_small_buffer_gives_same_boundaries() {
    let path = fixture("simple.mbox");
    let big: Vec<_> = MboxSegmenter::new(&path)
        .unwrap()
        .iter()
        .unwrap()
        .map(|m| m.map(|m| (m.start, m.end)).unwrap())
        .collect();
    let small: Vec<_> = MboxSegmenter::new(&path)
        .unwrap()
        .with_buffer_size(7)
        .iter()
        .unwrap()
        .map(|m| m.map(|m| (m.start, m.end)).unwrap())
        .collect();
    assert_eq!(big, small);
}

// ─── Indexing ───────────────────────────────────────────────────────

#[test]
fn test_index_fixture() {
    let temp = TempDir::new().unwrap();
    let archive = temp_fixture(&temp);

    let summary = index(&archive);
    assert_eq!(summary.processed, 5);
    assert_eq!(summary.inserted, 5);
    assert_eq!(summary.failed, 0);
    temp.child("simple-index.db").assert(predicate::path::is_file());

    let store = IndexStore::open_read_only(index_path_for(&archive)).unwrap();
    assert_eq!(store.count().unwrap(), 5);
    assert_eq!(store.fulltext_count().unwrap(), 5);
}

#[test]
fn test_index_twice_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let archive = temp_fixture(&temp);

    index(&archive);
    let second = index(&archive);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 5);

    let store = IndexStore::open_read_only(index_path_for(&archive)).unwrap();
    assert_eq!(store.count().unwrap(), 5);
    assert_eq!(store.fulltext_count().unwrap(), 5);
}

#[test]
fn test_appended_messages_are_added() {
    let temp = TempDir::new().unwrap();
    let archive = temp_fixture(&temp);
    index(&archive);

    let mut contents = std::fs::read(&archive).unwrap();
    contents.extend_from_slice(
        b"\nFrom late@example.com Sat Jan  6 12:00:00 2024\n\
          From: Late <late@example.com>\n\
          Subject: Appended later\n\
          Message-ID: <msg006@example.com>\n\
          \n\
          Arrived after the first run.\n",
    );
    std::fs::write(&archive, contents).unwrap();

    let summary = index(&archive);
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.duplicates, 5);
    let store = IndexStore::open_read_only(index_path_for(&archive)).unwrap();
    assert_eq!(store.search("appended").unwrap().len(), 1);
}

#[test]
fn test_missing_archive_creates_no_store() {
    let temp = TempDir::new().unwrap();
    let archive = temp.child("nope.mbox");
    let store_path = index_path_for(archive.path());

    let result = build_index(archive.path(), &store_path, &IndexOptions::default(), None);
    assert!(matches!(result, Err(MboxError::FileNotFound(_))));
    temp.child("nope-index.db").assert(predicate::path::missing());
}

#[test]
fn test_broken_headers_still_indexed() {
    let temp = TempDir::new().unwrap();
    let archive = temp.child("broken.mbox");
    archive
        .write_str(
            "From a@x Mon Jan  1 00:00:00 2024\n\
             From: Alice <a@x>\n\
             Subject: First\n\
             Message-ID: <1@x>\n\
             \n\
             alpha body\n\
             From b@x Mon Jan  1 00:00:00 2024\n\
             this line is not a header\n\
             : neither is this\n\
             \n\
             bravo body\n\
             From c@x Mon Jan  1 00:00:00 2024\n\
             From: Carol <c@x>\n\
             Subject: Third\n\
             Message-ID: <3@x>\n\
             \n\
             charlie body\n",
        )
        .unwrap();

    let summary = index(archive.path());
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.failed, 0);

    let store = IndexStore::open_read_only(index_path_for(archive.path())).unwrap();
    let hits = store.search("bravo").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].sender, NO_SENDER);
    assert_eq!(hits[0].subject, NO_SUBJECT);
    assert_eq!(store.search("charlie").unwrap()[0].subject, "Third");
}

#[test]
fn test_bom_before_first_message() {
    let temp = TempDir::new().unwrap();
    let archive = temp.child("bom.mbox");
    archive
        .write_binary(
            b"\xEF\xBB\xBFFrom a@x Mon Jan  1 00:00:00 2024\n\
              Subject: First\n\
              Message-ID: <1@x>\n\
              \n\
              alpha body\n\
              From b@x Mon Jan  1 00:00:00 2024\n\
              Subject: Second\n\
              Message-ID: <2@x>\n\
              \n\
              bravo body\n",
        )
        .unwrap();

    let summary = index(archive.path());
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.inserted, 2);

    let store = IndexStore::open_read_only(index_path_for(archive.path())).unwrap();
    let hit = &store.search("alpha").unwrap()[0];
    assert_eq!(hit.subject, "First");
    let record = store.record(hit.id).unwrap().unwrap();
    assert_eq!(record.start_offset, 0);
    let coverage = store.coverage().unwrap();
    assert_eq!(coverage.indexed_bytes, std::fs::metadata(archive.path()).unwrap().len());
}

#[test]
fn test_empty_message_is_skipped() {
    let temp = TempDir::new().unwrap();
    let archive = temp.child("empty.mbox");
    archive
        .write_str(
            "From a@x Mon Jan  1 00:00:00 2024\n\
             \n\
             From b@x Mon Jan  1 00:00:00 2024\n\
             Subject: Real\n\
             \n\
             real body\n",
        )
        .unwrap();

    let summary = index(archive.path());
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.failed, 1);
}

#[test]
fn test_missing_message_id_gets_offset_key() {
    let temp = TempDir::new().unwrap();
    let archive = temp_fixture(&temp);
    index(&archive);

    let store = IndexStore::open_read_only(index_path_for(&archive)).unwrap();
    let hit = &store.search("no id here").unwrap()[0];
    let record = store.record(hit.id).unwrap().unwrap();
    assert_eq!(record.message_id, format!("missing-id-{}", record.start_offset));
}

// ─── Retrieval ──────────────────────────────────────────────────────

#[test]
fn test_records_read_back_byte_for_byte() {
    let temp = TempDir::new().unwrap();
    let archive = temp_fixture(&temp);
    index(&archive);

    let segments: Vec<_> = MboxSegmenter::new(&archive)
        .unwrap()
        .iter()
        .unwrap()
        .map(Result::unwrap)
        .collect();
    let store = IndexStore::open_read_only(index_path_for(&archive)).unwrap();
    let mut reader = ArchiveReader::open(&archive).unwrap();

    for id in 1..=5 {
        let record = store.record(id).unwrap().unwrap();
        let raw = reader.raw_message(&record).unwrap();
        let segment = segments
            .iter()
            .find(|s| s.start == record.start_offset)
            .unwrap();
        assert_eq!(raw, segment.bytes);
        assert_eq!(record.end_offset, segment.end);
    }
}

#[test]
fn test_search_literal_operators() {
    let temp = TempDir::new().unwrap();
    let archive = temp_fixture(&temp);
    index(&archive);
    let store = IndexStore::open_read_only(index_path_for(&archive)).unwrap();

    assert_eq!(store.search("\"quotes\" OR stars*").unwrap().len(), 1);
    assert_eq!(store.search("OR stars").unwrap().len(), 1);
    // As a phrase, "hello OR invoice" matches nothing.
    assert!(store.search("hello OR invoice").unwrap().is_empty());
}

#[test]
fn test_search_decoded_headers_and_html() {
    let temp = TempDir::new().unwrap();
    let archive = temp_fixture(&temp);
    index(&archive);
    let store = IndexStore::open_read_only(index_path_for(&archive)).unwrap();

    let hits = store.search("García").unwrap();
    assert_eq!(hits.len(), 1);
    assert!(predicate::str::contains("José García").eval(&hits[0].sender));
    assert_eq!(hits[0].subject, "Café meeting");

    let hits = store.search("invoice").unwrap();
    assert_eq!(hits.len(), 2);
    // Newest first by raw date string.
    assert_eq!(hits[0].subject, "Re: Invoice #42");
}

#[test]
fn test_shrunk_archive_reports_truncation() {
    let temp = TempDir::new().unwrap();
    let archive = temp_fixture(&temp);
    index(&archive);

    let store = IndexStore::open_read_only(index_path_for(&archive)).unwrap();
    let last = store.record(5).unwrap().unwrap();
    let contents = std::fs::read(&archive).unwrap();
    std::fs::write(&archive, &contents[..contents.len() - 10]).unwrap();

    let mut reader = ArchiveReader::open(&archive).unwrap();
    assert!(matches!(
        reader.raw_message(&last),
        Err(MboxError::Truncated { .. })
    ));
}
