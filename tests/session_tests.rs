//! Integration tests for the paginated result session.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

use mboxdex::index::{build_index, index_path_for, IndexOptions};
use mboxdex::pager::{LineInput, Palette, Session, SessionOptions};
use mboxdex::store::{ArchiveReader, IndexStore};

/// Archive with `n` messages that all mention "invoice".
fn invoice_archive(temp: &TempDir, n: usize) -> PathBuf {
    let mut text = String::new();
    for i in 1..=n {
        text.push_str(&format!(
            "From billing@example.com Mon Jan  1 00:00:00 2024\n\
             From: Billing <billing@example.com>\n\
             Subject: Invoice {i:02}\n\
             Date: 2024-01-{i:02}\n\
             Message-ID: <inv{i}@example.com>\n\
             \n\
             Invoice number {i} is due.\n\n"
        ));
    }
    let archive = temp.child("billing.mbox");
    archive.write_str(&text).unwrap();
    let path = archive.path().to_path_buf();
    build_index(&path, &index_path_for(&path), &IndexOptions::default(), None).unwrap();
    path
}

fn run_session(archive: &Path, term: &str, input: &str) -> String {
    let store = IndexStore::open_read_only(index_path_for(archive)).unwrap();
    let mut reader = ArchiveReader::open(archive).unwrap();
    let hits = store.search(term).unwrap();
    let options = SessionOptions {
        palette: Palette::plain(),
        ..SessionOptions::default()
    };

    let mut out = Vec::new();
    Session::new(
        &store,
        &mut reader,
        term,
        hits,
        options,
        LineInput::new(Cursor::new(input.to_string())),
        &mut out,
    )
    .run()
    .unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_twenty_five_results_paginate() {
    let temp = TempDir::new().unwrap();
    let archive = invoice_archive(&temp, 25);

    let text = run_session(&archive, "invoice", "n\nn\nq\n");

    assert!(predicate::str::contains("--- Found 25 matching emails ---").eval(&text));
    assert!(predicate::str::contains("--- Page 1 of 2 ---").eval(&text));
    assert!(predicate::str::contains("--- Page 2 of 2 ---").eval(&text));
    assert!(predicate::str::contains("[020] ").eval(&text));
    assert!(predicate::str::contains("[025] ").eval(&text));
    assert!(!predicate::str::contains("[026] ").eval(&text));
    assert!(predicate::str::contains("Already on the last page.").eval(&text));

    // Page 1 is rendered once, page 2 twice (after `n` and after the notice).
    assert_eq!(text.matches("--- Page 2 of 2 ---").count(), 2);
}

#[test]
fn test_results_sorted_by_date_descending() {
    let temp = TempDir::new().unwrap();
    let archive = invoice_archive(&temp, 25);

    let text = run_session(&archive, "invoice", "q\n");
    let first = text.lines().find(|l| l.starts_with("[001]")).unwrap();
    assert!(predicate::str::contains("2024-01-25").eval(first));
    assert!(predicate::str::contains("*Invoice* 25").eval(first));
}

#[test]
fn test_detail_view_and_back() {
    let temp = TempDir::new().unwrap();
    let archive = invoice_archive(&temp, 3);

    let text = run_session(&archive, "number 2", "1\n\nq\n");
    assert!(predicate::str::contains("--- Found 1 matching emails ---").eval(&text));
    assert!(predicate::str::contains("Subject   : Invoice 02").eval(&text));
    assert!(predicate::str::contains("Invoice *number 2* is due.").eval(&text));
    assert_eq!(text.matches("--- Found 1 matching emails ---").count(), 2);
}

#[test]
fn test_invalid_inputs_keep_state() {
    let temp = TempDir::new().unwrap();
    let archive = invoice_archive(&temp, 3);

    let text = run_session(&archive, "invoice", "p\n0\n99\nwhat\n");
    assert!(predicate::str::contains("Already on the first page.").eval(&text));
    assert!(predicate::str::contains("Invalid number.").eval(&text));
    assert!(predicate::str::contains("Invalid input.").eval(&text));
    // End of input leaves the session like `q`.
    assert_eq!(text.matches("--- Found 3 matching emails ---").count(), 5);
}

#[test]
fn test_resize_pages() {
    let temp = TempDir::new().unwrap();
    let archive = invoice_archive(&temp, 25);

    let text = run_session(&archive, "invoice", "-\n-\n-\n-\nq\n");
    // 20 -> 15 -> 10 -> 5, then the minimum is reported.
    assert!(predicate::str::contains("--- Page 1 of 5 ---").eval(&text));
    assert!(predicate::str::contains("Page size is already at its minimum (5).").eval(&text));
}

#[test]
fn test_archive_changed_after_indexing() {
    let temp = TempDir::new().unwrap();
    let archive = invoice_archive(&temp, 3);
    std::fs::write(&archive, b"From x\n").unwrap();

    let text = run_session(&archive, "invoice", "1\n\nq\n");
    assert!(predicate::str::contains("Error: ").eval(&text));
    assert!(predicate::str::contains("truncated").eval(&text));
}
