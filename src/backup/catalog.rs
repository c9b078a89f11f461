//! Archive catalog
//!
//! Enumerates archives in the storage root by filename alone; archive
//! contents are never opened.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::naming::{has_archive_suffix, ArchiveName};
use crate::error::{VaultError, VaultResult};
use crate::storage::file_io::is_partial_name;

/// Metadata about one locally retained archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveInfo {
    /// Archive filename
    pub name: String,
    /// Full path to the archive
    pub path: PathBuf,
    /// Size in bytes
    pub size_bytes: u64,
    /// Last-modified time, taken as the creation time
    pub created_at_epoch_seconds: i64,
    /// Parsed name/kind/timestamp when the filename follows the convention
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub label: Option<ArchiveName>,
}

impl ArchiveInfo {
    /// Describe a single archive file, wherever it lives
    pub fn from_path(path: &Path) -> VaultResult<Self> {
        let metadata = fs::metadata(path).map_err(|e| VaultError::catalog(path, e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_metadata(path.to_path_buf(), file_name, &metadata))
    }

    fn from_metadata(path: PathBuf, file_name: String, metadata: &fs::Metadata) -> Self {
        Self {
            path,
            size_bytes: metadata.len(),
            created_at_epoch_seconds: modified_epoch_seconds(metadata),
            label: ArchiveName::parse(&file_name),
            name: file_name,
        }
    }
}

/// Lists archives kept under a storage root
#[derive(Debug, Clone)]
pub struct ArchiveCatalog {
    root: PathBuf,
}

impl ArchiveCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// List all archives, in directory enumeration order
    ///
    /// A missing or unreadable storage root is an error.
    pub fn list(&self) -> VaultResult<Vec<ArchiveInfo>> {
        let read_dir = fs::read_dir(&self.root).map_err(|e| VaultError::catalog(&self.root, e))?;

        let mut archives = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| VaultError::catalog(&self.root, e))?;
            let file_name = entry.file_name().to_string_lossy().into_owned();

            if !has_archive_suffix(&file_name) || is_partial_name(&file_name) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    // Removed between read_dir and stat.
                    debug!(file = %file_name, error = %e, "skipping vanished catalog entry");
                    continue;
                }
            };

            archives.push(ArchiveInfo::from_metadata(entry.path(), file_name, &metadata));
        }

        debug!(root = %self.root.display(), count = archives.len(), "listed archives");
        Ok(archives)
    }

    /// List archives sorted newest first
    pub fn list_newest_first(&self) -> VaultResult<Vec<ArchiveInfo>> {
        let mut archives = self.list()?;
        archives.sort_by(|a, b| {
            b.created_at_epoch_seconds
                .cmp(&a.created_at_epoch_seconds)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(archives)
    }

    /// Look up one archive by filename
    pub fn find(&self, file_name: &str) -> VaultResult<Option<ArchiveInfo>> {
        Ok(self.list()?.into_iter().find(|a| a.name == file_name))
    }

    /// The most recently modified archive
    pub fn latest(&self) -> VaultResult<Option<ArchiveInfo>> {
        Ok(self.list_newest_first()?.into_iter().next())
    }
}

fn modified_epoch_seconds(metadata: &fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn populated_root() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("site1-full-2025-03-09-14-05-07.tar.gz"), b"12345").unwrap();
        fs::write(root.join("legacy.tar.gz"), b"abc").unwrap();
        fs::write(root.join("notes.txt"), b"ignore me").unwrap();
        fs::write(root.join(".site1-full-2025-03-09-14-05-08.tar.gz.abcd.partial"), b"").unwrap();
        fs::create_dir(root.join("dir.tar.gz")).unwrap();
        temp_dir
    }

    #[test]
    fn test_list_filters_by_suffix() {
        let temp = populated_root();
        let catalog = ArchiveCatalog::new(temp.path());

        let mut names: Vec<String> = catalog.list().unwrap().into_iter().map(|a| a.name).collect();
        names.sort();

        assert_eq!(
            names,
            vec!["legacy.tar.gz", "site1-full-2025-03-09-14-05-07.tar.gz"]
        );
    }

    #[test]
    fn test_list_reports_size_and_label() {
        let temp = populated_root();
        let catalog = ArchiveCatalog::new(temp.path());

        let info = catalog
            .find("site1-full-2025-03-09-14-05-07.tar.gz")
            .unwrap()
            .unwrap();
        assert_eq!(info.size_bytes, 5);
        assert!(info.created_at_epoch_seconds > 0);
        assert_eq!(info.label.as_ref().unwrap().kind, "full");

        let legacy = catalog.find("legacy.tar.gz").unwrap().unwrap();
        assert!(legacy.label.is_none());
    }

    #[test]
    fn test_missing_root_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = ArchiveCatalog::new(temp_dir.path().join("missing"));

        let err = catalog.list().unwrap_err();
        assert!(matches!(err, VaultError::Catalog { .. }));
    }

    #[test]
    fn test_empty_root() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = ArchiveCatalog::new(temp_dir.path());

        assert!(catalog.list().unwrap().is_empty());
        assert!(catalog.latest().unwrap().is_none());
    }

    #[test]
    fn test_from_path_outside_root() {
        let temp = populated_root();
        let info =
            ArchiveInfo::from_path(&temp.path().join("site1-full-2025-03-09-14-05-07.tar.gz"))
                .unwrap();
        assert_eq!(info.name, "site1-full-2025-03-09-14-05-07.tar.gz");
        assert_eq!(info.size_bytes, 5);
        assert_eq!(info.label.unwrap().name, "site1");

        let err = ArchiveInfo::from_path(&temp.path().join("gone.tar.gz")).unwrap_err();
        assert!(matches!(err, VaultError::Catalog { .. }));
    }

    #[test]
    fn test_json_shape() {
        let info = ArchiveInfo {
            name: "a.tar.gz".into(),
            path: PathBuf::from("/var/backups/a.tar.gz"),
            size_bytes: 10,
            created_at_epoch_seconds: 1700000000,
            label: None,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["sizeBytes"], 10);
        assert_eq!(json["createdAtEpochSeconds"], 1700000000);
        assert!(json.get("label").is_none());
    }
}
