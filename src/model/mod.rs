//! Records stored in the index and returned by searches.

pub mod mail;
