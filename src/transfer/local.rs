//! Directory-backed object store

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use super::{validate_key, ObjectRef, ObjectStore};
use crate::error::{VaultError, VaultResult};

/// Stores each object at `<root>/<bucket>/<key>`
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, object: &ObjectRef) -> VaultResult<PathBuf> {
        validate_key(&object.key)?;
        validate_key(&object.bucket)
            .map_err(|_| VaultError::Validation(format!("Invalid bucket: '{}'", object.bucket)))?;
        Ok(self.root.join(&object.bucket).join(&object.key))
    }
}

impl ObjectStore for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    fn put_file(&self, object: &ObjectRef, source: &Path) -> VaultResult<u64> {
        let dest = self.object_path(object)?;
        let bucket_dir = self.root.join(&object.bucket);
        if !bucket_dir.is_dir() {
            return Err(VaultError::transfer(&object.key, format!(
                "bucket '{}' does not exist",
                object.bucket
            )));
        }

        let fail = |e: io::Error| VaultError::transfer(&object.key, e);
        let mut reader = BufReader::new(File::open(source).map_err(|e| {
            VaultError::transfer(&object.key, format!("cannot read {}: {}", source.display(), e))
        })?);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(fail)?;
        }
        let mut writer = BufWriter::new(File::create(&dest).map_err(fail)?);
        let bytes = io::copy(&mut reader, &mut writer).map_err(fail)?;
        writer.flush().map_err(fail)?;

        info!(object = %object, bytes, "uploaded to local store");
        Ok(bytes)
    }

    fn get_to_file(&self, object: &ObjectRef, destination: &Path) -> VaultResult<u64> {
        let src = self.object_path(object)?;
        let fail = |e: io::Error| VaultError::transfer(&object.key, e);

        let file = File::open(&src).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                VaultError::transfer(&object.key, format!("object not found in '{}'", object.bucket))
            } else {
                fail(e)
            }
        })?;
        let mut reader = BufReader::new(file);
        let mut writer = BufWriter::new(File::create(destination).map_err(fail)?);
        let bytes = io::copy(&mut reader, &mut writer).map_err(fail)?;
        writer.flush().map_err(fail)?;

        info!(object = %object, bytes, "downloaded from local store");
        Ok(bytes)
    }

    fn exists(&self, object: &ObjectRef) -> VaultResult<bool> {
        Ok(self.object_path(object)?.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with_bucket() -> (LocalStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("remote/backups")).unwrap();
        (LocalStore::new(temp_dir.path().join("remote")), temp_dir)
    }

    #[test]
    fn test_put_then_get_is_byte_identical() {
        let (store, temp) = store_with_bucket();
        let source = temp.path().join("a.tar.gz");
        let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&source, &payload).unwrap();

        let object = ObjectRef::new("backups", "hosts/web1/a.tar.gz");
        assert_eq!(store.put_file(&object, &source).unwrap(), payload.len() as u64);
        assert!(store.exists(&object).unwrap());

        let dest = temp.path().join("restored.tar.gz");
        store.get_to_file(&object, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), payload);
    }

    #[test]
    fn test_missing_bucket_is_transfer_error() {
        let (store, temp) = store_with_bucket();
        let source = temp.path().join("a.tar.gz");
        fs::write(&source, b"x").unwrap();

        let err = store
            .put_file(&ObjectRef::new("nope", "a.tar.gz"), &source)
            .unwrap_err();
        assert!(matches!(err, VaultError::Transfer { .. }));
    }

    #[test]
    fn test_missing_object_is_transfer_error() {
        let (store, temp) = store_with_bucket();
        let object = ObjectRef::new("backups", "absent.tar.gz");

        assert!(!store.exists(&object).unwrap());
        let err = store
            .get_to_file(&object, &temp.path().join("out"))
            .unwrap_err();
        assert!(err.to_string().contains("absent.tar.gz"));
    }

    #[test]
    fn test_escaping_key_rejected() {
        let (store, temp) = store_with_bucket();
        let err = store
            .get_to_file(&ObjectRef::new("backups", "../../etc/passwd"), &temp.path().join("x"))
            .unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));
    }
}
