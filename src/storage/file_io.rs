//! File I/O utilities with atomic writes
//!
//! Provides safe file operations that won't leave torn files behind on failure.
//! [`PartialFile`] is the scoped form: it hands out a hidden temp file next to
//! the destination and either renames it into place on [`PartialFile::commit`]
//! or deletes it when dropped.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::error::{VaultError, VaultResult};

/// Suffix carried by in-flight temp files
pub const PARTIAL_SUFFIX: &str = ".partial";

/// A destination file that only becomes visible once fully written
#[derive(Debug)]
pub struct PartialFile {
    temp_path: PathBuf,
    final_path: PathBuf,
    committed: bool,
}

impl PartialFile {
    /// Reserve a temp path in the same directory as `final_path`
    ///
    /// The parent directory is created if missing, since rename only stays
    /// atomic within one filesystem.
    pub fn new(final_path: impl Into<PathBuf>) -> VaultResult<Self> {
        let final_path = final_path.into();
        let file_name = final_path
            .file_name()
            .ok_or_else(|| {
                VaultError::Validation(format!(
                    "Destination has no file name: {}",
                    final_path.display()
                ))
            })?
            .to_string_lossy()
            .into_owned();

        let parent = match final_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| {
            VaultError::Io(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;

        let temp_path = parent.join(format!(
            ".{}.{}{}",
            file_name,
            Uuid::new_v4().simple(),
            PARTIAL_SUFFIX
        ));

        Ok(Self {
            temp_path,
            final_path,
            committed: false,
        })
    }

    /// Create (or truncate) the temp file for writing
    pub fn create_file(&self) -> VaultResult<File> {
        File::create(&self.temp_path).map_err(|e| {
            VaultError::Io(format!(
                "Failed to create temp file {}: {}",
                self.temp_path.display(),
                e
            ))
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Rename the temp file over the destination
    pub fn commit(mut self) -> VaultResult<PathBuf> {
        fs::rename(&self.temp_path, &self.final_path).map_err(|e| {
            VaultError::Io(format!(
                "Failed to move {} into place: {}",
                self.final_path.display(),
                e
            ))
        })?;
        self.committed = true;
        Ok(self.final_path.clone())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed && self.temp_path.exists() {
            debug!(path = %self.temp_path.display(), "discarding partial file");
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// Returns true for temp files written by [`PartialFile`]
pub fn is_partial_name(file_name: &str) -> bool {
    file_name.starts_with('.') && file_name.ends_with(PARTIAL_SUFFIX)
}

/// Write bytes to a file atomically (write to temp, then rename)
pub fn write_atomic<P: AsRef<Path>>(path: P, contents: &[u8]) -> VaultResult<()> {
    let partial = PartialFile::new(path.as_ref())?;
    let mut writer = BufWriter::new(partial.create_file()?);

    writer
        .write_all(contents)
        .map_err(|e| VaultError::Io(format!("Failed to write data: {}", e)))?;
    writer
        .flush()
        .map_err(|e| VaultError::Io(format!("Failed to flush data: {}", e)))?;

    // Sync to disk before rename
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| VaultError::Io(format!("Failed to sync data: {}", e)))?;
    drop(writer);

    partial.commit()?;
    Ok(())
}
