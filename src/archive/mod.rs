//! Archive format for Hostvault
//!
//! Turns a directory tree into a single compressed stream and back.
//!
//! # Architecture
//!
//! - `EntryWalker`: lazy depth-first walk, parents before children
//! - `ArchiveEncoder`: tar headers + exact content, one gzip stream
//! - `ArchiveDecoder`: sequential restore with modes applied
//!
//! # Format
//!
//! A `.tar.gz`: GNU tar entries in walk order, the tree root stored as `.`.
//! Only regular files and directories round-trip; other node types are stored
//! as header-only shells and skipped on restore.
//!
//! # Example
//!
//! ```rust,ignore
//! use hostvault::archive::{encode_tree, ArchiveDecoder};
//!
//! let file = std::fs::File::create("/tmp/site.tar.gz")?;
//! let (file, stats) = encode_tree(Path::new("/srv/site"), file, "/tmp/site.tar.gz")?;
//! file.sync_all()?;
//!
//! ArchiveDecoder::open(Path::new("/tmp/site.tar.gz"))?.extract_to(Path::new("/srv/restored"))?;
//! ```

mod decoder;
mod encoder;
mod entry;
mod walker;

pub use decoder::{ArchiveDecoder, DecodeStats, EntrySummary};
pub use encoder::{encode_tree, ArchiveEncoder, EncodeStats};
pub use entry::{Entry, EntryKind};
pub use walker::{walk_all, EntryWalker};
