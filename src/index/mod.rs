//! Building the search index from an archive.

pub mod builder;

pub use builder::{build_index, index_path_for, IndexOptions, IndexProgress, IndexSummary};
