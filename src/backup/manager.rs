//! Backup manager for Hostvault
//!
//! Names new archives, drives the encoder and decoder against the storage
//! root, and exposes the catalog and remote transfer.
//!
//! Partial artifacts: archive creation and downloads go through a temp file
//! that is renamed into place only on success. A failed restore is not rolled
//! back; entries already extracted stay in the target directory.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use super::catalog::{ArchiveCatalog, ArchiveInfo};
use super::naming::ArchiveName;
use crate::archive::{encode_tree, ArchiveDecoder, DecodeStats, EncodeStats, EntrySummary};
use crate::error::{VaultError, VaultResult};
use crate::storage::file_io::PartialFile;
use crate::transfer::{validate_key, ObjectRef, ObjectStore};

/// Outcome of a successful `create_backup`
#[derive(Debug, Clone)]
pub struct CreatedBackup {
    pub name: ArchiveName,
    pub path: PathBuf,
    pub stats: EncodeStats,
}

/// Manages archive creation, restore, listing and transfer
pub struct BackupManager {
    /// Directory holding local archives
    storage_root: PathBuf,
    catalog: ArchiveCatalog,
    remote: Option<Box<dyn ObjectStore>>,
    default_bucket: String,
}

impl BackupManager {
    /// Create a manager without remote transfer
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        let storage_root = storage_root.into();
        Self {
            catalog: ArchiveCatalog::new(&storage_root),
            storage_root,
            remote: None,
            default_bucket: String::new(),
        }
    }

    /// Attach an object store and the bucket used when callers give none
    pub fn with_remote(
        mut self,
        store: Box<dyn ObjectStore>,
        default_bucket: impl Into<String>,
    ) -> Self {
        self.remote = Some(store);
        self.default_bucket = default_bucket.into();
        self
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn catalog(&self) -> &ArchiveCatalog {
        &self.catalog
    }

    /// Archive `source` as `<name>-<kind>-<now>.tar.gz`
    ///
    /// Returns the path to the created archive.
    pub fn create_backup(&self, name: &str, kind: &str, source: &Path) -> VaultResult<PathBuf> {
        Ok(self.create_backup_at(name, kind, source, Utc::now())?.path)
    }

    /// Archive `source` with an explicit creation instant
    ///
    /// An existing archive with the same filename is replaced atomically.
    pub fn create_backup_at(
        &self,
        name: &str,
        kind: &str,
        source: &Path,
        at: DateTime<Utc>,
    ) -> VaultResult<CreatedBackup> {
        let archive_name = ArchiveName::new(name, kind, at)?;

        // Ensure storage root exists
        fs::create_dir_all(&self.storage_root).map_err(|e| {
            VaultError::Io(format!(
                "Failed to create storage root {}: {}",
                self.storage_root.display(),
                e
            ))
        })?;

        let final_path = self.storage_root.join(archive_name.file_name());
        info!(archive = %final_path.display(), source = %source.display(), "creating backup");

        let partial = PartialFile::new(&final_path)?;
        let sink = BufWriter::new(partial.create_file()?);

        let (mut sink, stats) = encode_tree(source, sink, &final_path)?;
        sink.flush()
            .map_err(|e| VaultError::encoding(&final_path, e))?;
        sink.get_ref()
            .sync_all()
            .map_err(|e| VaultError::encoding(&final_path, e))?;
        drop(sink);

        let path = partial.commit()?;
        info!(archive = %path.display(), entries = stats.entries, "backup created");

        Ok(CreatedBackup {
            name: archive_name,
            path,
            stats,
        })
    }

    /// Restore an archive into `target`
    ///
    /// The archive itself is only read.
    pub fn restore_backup(&self, archive_path: &Path, target: &Path) -> VaultResult<DecodeStats> {
        if !archive_path.is_file() {
            return Err(VaultError::archive_not_found(
                archive_path.display().to_string(),
            ));
        }
        ArchiveDecoder::open(archive_path)?.extract_to(target)
    }

    /// List stored entries of an archive without extracting
    pub fn inspect_backup(&self, archive_path: &Path) -> VaultResult<Vec<EntrySummary>> {
        ArchiveDecoder::open(archive_path)?.entries()
    }

    /// List all local archives (order unspecified)
    pub fn list_backups(&self) -> VaultResult<Vec<ArchiveInfo>> {
        self.catalog.list()
    }

    /// Resolve `latest`, a filename in the storage root, or a path
    pub fn resolve_archive(&self, identifier: &str) -> VaultResult<PathBuf> {
        if identifier.eq_ignore_ascii_case("latest") {
            return self
                .catalog
                .latest()?
                .map(|a| a.path)
                .ok_or_else(|| VaultError::archive_not_found("latest"));
        }

        let in_root = self.storage_root.join(identifier);
        if !identifier.contains(std::path::MAIN_SEPARATOR) && in_root.is_file() {
            return Ok(in_root);
        }

        let path = PathBuf::from(identifier);
        if path.is_file() {
            return Ok(path);
        }

        Err(VaultError::archive_not_found(identifier))
    }

    /// Upload a local archive; the key defaults to its filename
    pub fn upload_archive(
        &self,
        archive_path: &Path,
        key: Option<&str>,
        bucket: Option<&str>,
    ) -> VaultResult<ObjectRef> {
        let store = self.store()?;
        let key = match key {
            Some(k) => k.to_string(),
            None => default_key(archive_path)?,
        };
        let object = self.object_ref(key, bucket)?;

        info!(archive = %archive_path.display(), object = %object, "uploading archive");
        let bytes = store.put_file(&object, archive_path)?;
        info!(object = %object, bytes, "upload complete");
        Ok(object)
    }

    /// Download an object; the destination defaults to `<storage_root>/<key>`
    ///
    /// The file only appears at the destination once fully downloaded.
    pub fn download_archive(
        &self,
        key: &str,
        destination: Option<&Path>,
        bucket: Option<&str>,
    ) -> VaultResult<PathBuf> {
        let store = self.store()?;
        let object = self.object_ref(key.to_string(), bucket)?;

        let destination = match destination {
            Some(path) => path.to_path_buf(),
            None => {
                let file_name = Path::new(key).file_name().ok_or_else(|| {
                    VaultError::Validation(format!("Key has no file name: '{}'", key))
                })?;
                self.storage_root.join(file_name)
            }
        };

        info!(object = %object, destination = %destination.display(), "downloading archive");
        let partial = PartialFile::new(&destination)?;
        let bytes = store.get_to_file(&object, partial.temp_path())?;
        let path = partial.commit()?;
        info!(object = %object, bytes, "download complete");
        Ok(path)
    }

    /// Whether an object exists in the remote store
    pub fn remote_exists(&self, key: &str, bucket: Option<&str>) -> VaultResult<bool> {
        let object = self.object_ref(key.to_string(), bucket)?;
        self.store()?.exists(&object)
    }

    fn store(&self) -> VaultResult<&dyn ObjectStore> {
        self.remote
            .as_deref()
            .ok_or_else(|| VaultError::Config("No remote object store is configured".into()))
    }

    fn object_ref(&self, key: String, bucket: Option<&str>) -> VaultResult<ObjectRef> {
        validate_key(&key)?;
        let bucket = bucket.unwrap_or(&self.default_bucket);
        if bucket.is_empty() {
            return Err(VaultError::Config(
                "No bucket given and remote.bucket is not set".into(),
            ));
        }
        Ok(ObjectRef::new(bucket, key))
    }
}

fn default_key(archive_path: &Path) -> VaultResult<String> {
    archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            VaultError::Validation(format!(
                "Archive path has no file name: {}",
                archive_path.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::file_io::is_partial_name;
    use crate::transfer::LocalStore;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn create_test_manager() -> (BackupManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let remote_root = temp_dir.path().join("remote");
        fs::create_dir_all(remote_root.join("backups")).unwrap();

        let manager = BackupManager::new(temp_dir.path().join("storage"))
            .with_remote(Box::new(LocalStore::new(remote_root)), "backups");
        (manager, temp_dir)
    }

    fn make_source(root: &Path) -> PathBuf {
        let src = root.join("site");
        fs::create_dir_all(src.join("public")).unwrap();
        fs::write(src.join("public/index.html"), b"<h1>hi</h1>").unwrap();
        src
    }

    #[test]
    fn test_create_backup_names_and_storage_root() {
        let (manager, temp) = create_test_manager();
        let src = make_source(temp.path());
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();

        let created = manager.create_backup_at("site1", "full", &src, at).unwrap();

        assert_eq!(
            created.path,
            temp.path().join("storage/site1-full-2025-01-02-03-04-05.tar.gz")
        );
        assert!(created.path.is_file());
        assert_eq!(created.stats.files, 1);
    }

    #[test]
    fn test_failed_create_leaves_nothing() {
        let (manager, temp) = create_test_manager();

        let err = manager
            .create_backup("site1", "full", &temp.path().join("missing"))
            .unwrap_err();
        assert!(err.is_traversal());

        let leftovers: Vec<_> = fs::read_dir(manager.storage_root()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_fails_whole_create() {
        use std::os::unix::fs::PermissionsExt;

        let (manager, temp) = create_test_manager();
        let src = make_source(temp.path());
        let locked = src.join("public/assets");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("app.css"), b"body{}").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users read through mode 0o000.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = manager.create_backup("site1", "full", &src);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(result.unwrap_err().is_traversal());
        let leftovers: Vec<String> = fs::read_dir(manager.storage_root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(leftovers.is_empty(), "left behind: {:?}", leftovers);
    }

    #[test]
    fn test_invalid_name_rejected_before_writing() {
        let (manager, temp) = create_test_manager();
        let src = make_source(temp.path());

        let err = manager.create_backup("../evil", "full", &src).unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));
        assert!(!manager.storage_root().exists());
    }

    #[test]
    fn test_same_second_collision_replaces() {
        let (manager, temp) = create_test_manager();
        let src = make_source(temp.path());
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();

        manager.create_backup_at("site1", "full", &src, at).unwrap();
        fs::write(src.join("extra.txt"), b"more").unwrap();
        let second = manager.create_backup_at("site1", "full", &src, at).unwrap();

        assert_eq!(manager.list_backups().unwrap().len(), 1);
        assert_eq!(second.stats.files, 2);
    }

    #[test]
    fn test_restore_backup() {
        let (manager, temp) = create_test_manager();
        let src = make_source(temp.path());
        let archive = manager.create_backup("site1", "full", &src).unwrap();

        let target = temp.path().join("restored");
        let stats = manager.restore_backup(&archive, &target).unwrap();

        assert_eq!(stats.files, 1);
        assert_eq!(
            fs::read(target.join("public/index.html")).unwrap(),
            b"<h1>hi</h1>"
        );
    }

    #[test]
    fn test_restore_missing_archive() {
        let (manager, temp) = create_test_manager();
        let err = manager
            .restore_backup(&temp.path().join("nope.tar.gz"), &temp.path().join("t"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_resolve_archive() {
        let (manager, temp) = create_test_manager();
        let src = make_source(temp.path());
        let archive = manager.create_backup("site1", "full", &src).unwrap();
        let file_name = archive.file_name().unwrap().to_str().unwrap().to_string();

        assert_eq!(manager.resolve_archive("latest").unwrap(), archive);
        assert_eq!(manager.resolve_archive(&file_name).unwrap(), archive);
        assert_eq!(
            manager.resolve_archive(archive.to_str().unwrap()).unwrap(),
            archive
        );
        assert!(manager.resolve_archive("nope.tar.gz").unwrap_err().is_not_found());
    }

    #[test]
    fn test_upload_and_download_default_key() {
        let (manager, temp) = create_test_manager();
        let src = make_source(temp.path());
        let archive = manager.create_backup("site1", "full", &src).unwrap();
        let file_name = archive.file_name().unwrap().to_str().unwrap().to_string();

        let object = manager.upload_archive(&archive, None, None).unwrap();
        assert_eq!(object.key, file_name);
        assert_eq!(object.bucket, "backups");
        assert!(manager.remote_exists(&file_name, None).unwrap());

        let dest = temp.path().join("fetched.tar.gz");
        let fetched = manager
            .download_archive(&file_name, Some(&dest), None)
            .unwrap();
        assert_eq!(fs::read(&fetched).unwrap(), fs::read(&archive).unwrap());
    }

    #[test]
    fn test_failed_download_leaves_nothing() {
        let (manager, temp) = create_test_manager();
        let dest_dir = temp.path().join("downloads");
        fs::create_dir_all(&dest_dir).unwrap();

        let err = manager
            .download_archive("absent.tar.gz", Some(&dest_dir.join("absent.tar.gz")), None)
            .unwrap_err();
        assert!(matches!(err, VaultError::Transfer { .. }));

        let names: Vec<String> = fs::read_dir(&dest_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|n| !is_partial_name(n)));
        assert!(names.is_empty());
    }

    #[test]
    fn test_transfer_without_remote() {
        let temp_dir = TempDir::new().unwrap();
        let manager = BackupManager::new(temp_dir.path());
        let err = manager
            .upload_archive(&temp_dir.path().join("a.tar.gz"), None, None)
            .unwrap_err();
        assert!(matches!(err, VaultError::Config(_)));
    }
}
