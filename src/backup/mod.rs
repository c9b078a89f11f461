//! Backup system for Hostvault
//!
//! Creates compressed archives of directory trees in a storage root, restores
//! them, lists them and moves them to and from an object store.
//!
//! # Architecture
//!
//! - `BackupManager`: the entry point for create, restore, list, upload and download
//! - `ArchiveCatalog`: lists archives in the storage root by filename
//! - `ArchiveName`: the `<name>-<kind>-<timestamp>.tar.gz` naming convention
//!
//! # Example
//!
//! ```rust,ignore
//! use hostvault::backup::BackupManager;
//!
//! let manager = BackupManager::new("/var/backups");
//! let archive = manager.create_backup("site1", "full", Path::new("/srv/site1"))?;
//!
//! for backup in manager.list_backups()? {
//!     println!("{} ({} bytes)", backup.name, backup.size_bytes);
//! }
//!
//! manager.restore_backup(&archive, Path::new("/srv/site1-restored"))?;
//! ```

mod catalog;
mod manager;
mod naming;

pub use catalog::{ArchiveCatalog, ArchiveInfo};
pub use manager::{BackupManager, CreatedBackup};
pub use naming::{has_archive_suffix, ArchiveName, ARCHIVE_SUFFIX};
