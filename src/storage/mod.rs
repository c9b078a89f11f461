//! Storage helpers for Hostvault
//!
//! Provides temp-file-and-rename writes so that a failed write never leaves
//! a partial artifact under its final name.

pub mod file_io;

pub use file_io::{write_atomic, PartialFile};
