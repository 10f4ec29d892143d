//! Persistent index store and random access to the archive.

pub mod db;
pub mod reader;

pub use db::{IndexStore, IndexWriter, InsertOutcome};
pub use reader::ArchiveReader;
