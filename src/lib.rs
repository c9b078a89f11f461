//! Hostvault - archive and transfer backups of hosted sites
//!
//! Turns a live directory tree into a compressed, restorable archive in a
//! local storage root, restores archives back into directory trees, lists
//! retained archives, and moves them to and from a remote object store.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `archive`: Entry walker, encoder and decoder for the `.tar.gz` format
//! - `backup`: Naming, catalog and the `BackupManager` entry point
//! - `transfer`: Object stores (S3, local directory) and retries
//! - `config`: Paths and the YAML settings file
//! - `storage`: Atomic file writes
//! - `cli`, `display`: Command handlers and terminal formatting
//! - `logging`: `tracing` subscriber setup
//! - `error`: Custom error types
//!
//! # Example
//!
//! ```rust,ignore
//! use hostvault::backup::BackupManager;
//!
//! let manager = BackupManager::new("/var/backups");
//! let archive = manager.create_backup("site1", "full", Path::new("/srv/site1"))?;
//! manager.restore_backup(&archive, Path::new("/tmp/site1"))?;
//! ```

pub mod archive;
pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod storage;
pub mod transfer;

pub use error::{VaultError, VaultResult};
