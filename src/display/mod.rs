//! Display formatting for terminal output
//!
//! Provides table and detail views of archives and their entries.

pub mod backup;

pub use backup::{
    format_archive_details, format_archive_list, format_duration, format_entry_list, format_size,
};
