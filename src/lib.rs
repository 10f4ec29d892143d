//! `mboxdex`: full-text search over MBOX archives of any size.
//!
//! The archive is scanned once to find message boundaries and build a
//! SQLite FTS5 index holding byte offsets into the original file. Searches
//! run against the index, and messages are read back from the archive on
//! demand by their byte range.

pub mod config;
pub mod error;
pub mod index;
pub mod model;
pub mod pager;
pub mod parser;
pub mod search;
pub mod store;
