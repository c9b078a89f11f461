//! Remote transfer for Hostvault
//!
//! Moves archive files between the storage root and an object store.
//!
//! # Architecture
//!
//! - `ObjectStore`: blocking upload/download of whole files by bucket + key
//! - `S3Store`: any S3-compatible endpoint
//! - `LocalStore`: a directory laid out as `<root>/<bucket>/<key>`
//! - `Retrying`: exponential-backoff decorator around any store
//!
//! The stores themselves never retry; retrying is opt-in through
//! [`RetrySettings::max_attempts`].

mod local;
mod retry;
mod s3;

use std::path::{Component, Path};

use tracing::info;

pub use local::LocalStore;
pub use retry::Retrying;
pub use s3::S3Store;

use crate::config::{RemoteBackend, RemoteSettings, RetrySettings};
use crate::error::{VaultError, VaultResult};

/// Address of one object in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Blocking, file-granular object store
///
/// Implementations stream from and to disk; whole files are never buffered.
pub trait ObjectStore: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Upload `source` to `object`, returning the number of bytes sent
    fn put_file(&self, object: &ObjectRef, source: &Path) -> VaultResult<u64>;

    /// Download `object` into a new file at `destination`, returning its size
    ///
    /// A failed download may leave a partial file at `destination`.
    fn get_to_file(&self, object: &ObjectRef, destination: &Path) -> VaultResult<u64>;

    /// Whether `object` exists
    fn exists(&self, object: &ObjectRef) -> VaultResult<bool>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn put_file(&self, object: &ObjectRef, source: &Path) -> VaultResult<u64> {
        (**self).put_file(object, source)
    }

    fn get_to_file(&self, object: &ObjectRef, destination: &Path) -> VaultResult<u64> {
        (**self).get_to_file(object, destination)
    }

    fn exists(&self, object: &ObjectRef) -> VaultResult<bool> {
        (**self).exists(object)
    }
}

/// Build the configured store, wrapped for retries when enabled
pub fn open_store(
    remote: &RemoteSettings,
    retry: &RetrySettings,
) -> VaultResult<Box<dyn ObjectStore>> {
    let store: Box<dyn ObjectStore> = match remote.backend {
        RemoteBackend::S3 => Box::new(S3Store::new(remote)?),
        RemoteBackend::Local => {
            let root = remote.local_root.clone().ok_or_else(|| {
                VaultError::Config("remote.local_root is required for the local backend".into())
            })?;
            Box::new(LocalStore::new(root))
        }
    };

    info!(backend = store.name(), bucket = %remote.bucket, "object store ready");

    if retry.max_attempts > 1 {
        Ok(Box::new(Retrying::new(store, retry.clone())))
    } else {
        Ok(store)
    }
}

/// Reject keys that are empty or could address outside a bucket
pub fn validate_key(key: &str) -> VaultResult<()> {
    let path = Path::new(key);
    let safe = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if safe {
        Ok(())
    } else {
        Err(VaultError::Validation(format!("Invalid object key: '{}'", key)))
    }
}
