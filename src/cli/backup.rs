//! Backup CLI commands
//!
//! Implements CLI commands for archive management.

use std::path::PathBuf;

use clap::Subcommand;

use crate::backup::{ArchiveInfo, BackupManager};
use crate::config::Settings;
use crate::display::{
    format_archive_details, format_archive_list, format_entry_list, format_size,
};
use crate::error::VaultResult;
use crate::transfer::open_store;

/// Backup subcommands
#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Archive a directory into the storage root
    Create {
        /// Human label, e.g. the site name
        name: String,
        /// Backup category tag (no '-')
        kind: String,
        /// Directory to archive
        source: PathBuf,
    },

    /// Restore an archive into a directory
    Restore {
        /// Archive filename or path (use 'latest' for most recent)
        archive: String,
        /// Directory to restore into (created if missing)
        target: PathBuf,
    },

    /// List archives in the storage root
    List {
        /// Print a JSON array instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show information about an archive without extracting it
    Info {
        /// Archive filename or path (use 'latest' for most recent)
        archive: String,
        /// Also list every stored entry
        #[arg(short, long)]
        entries: bool,
    },

    /// Upload an archive to the remote store
    Upload {
        /// Archive filename or path (use 'latest' for most recent)
        archive: String,
        /// Object key (defaults to the archive filename)
        #[arg(short, long)]
        key: Option<String>,
        /// Bucket (defaults to remote.bucket)
        #[arg(short, long)]
        bucket: Option<String>,
    },

    /// Download an archive from the remote store
    Download {
        /// Object key
        key: String,
        /// Destination file (defaults to the storage root)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Bucket (defaults to remote.bucket)
        #[arg(short, long)]
        bucket: Option<String>,
    },
}

impl BackupCommands {
    fn needs_remote(&self) -> bool {
        matches!(
            self,
            BackupCommands::Upload { .. } | BackupCommands::Download { .. }
        )
    }
}

/// Handle a backup command
pub fn handle_backup_command(settings: &Settings, cmd: BackupCommands) -> VaultResult<()> {
    let mut manager = BackupManager::new(settings.storage_root.clone());
    if cmd.needs_remote() {
        let store = open_store(&settings.remote, &settings.retry)?;
        manager = manager.with_remote(store, settings.remote.bucket.clone());
    }

    match cmd {
        BackupCommands::Create { name, kind, source } => {
            let archive_path = manager.create_backup(&name, &kind, &source)?;
            println!("{}", archive_path.display());
        }

        BackupCommands::Restore { archive, target } => {
            let archive_path = manager.resolve_archive(&archive)?;
            let stats = manager.restore_backup(&archive_path, &target)?;

            println!(
                "Restored {} into {}",
                archive_path.display(),
                target.display()
            );
            println!(
                "  {} file(s), {} director(ies), {}",
                stats.files,
                stats.directories,
                format_size(stats.content_bytes)
            );
            if stats.skipped > 0 {
                println!("  {} unsupported entr(ies) skipped", stats.skipped);
            }
        }

        BackupCommands::List { json } => {
            let archives = manager.catalog().list_newest_first()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&archives)?);
            } else {
                println!("{}", format_archive_list(&archives, chrono::Utc::now()));
            }
        }

        BackupCommands::Info {
            archive,
            entries: list_entries,
        } => {
            let archive_path = manager.resolve_archive(&archive)?;
            let info = ArchiveInfo::from_path(&archive_path)?;
            let entries = manager.inspect_backup(&archive_path)?;

            println!("{}", format_archive_details(&info, &entries));
            if list_entries {
                println!();
                println!("{}", format_entry_list(&entries));
            }
        }

        BackupCommands::Upload {
            archive,
            key,
            bucket,
        } => {
            let archive_path = manager.resolve_archive(&archive)?;
            let object = manager.upload_archive(&archive_path, key.as_deref(), bucket.as_deref())?;
            println!("Uploaded {} to {}", archive_path.display(), object);
        }

        BackupCommands::Download {
            key,
            output,
            bucket,
        } => {
            let path = manager.download_archive(&key, output.as_deref(), bucket.as_deref())?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
