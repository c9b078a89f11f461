//! S3-compatible object store
//!
//! The AWS SDK is async; a private current-thread runtime keeps this store's
//! API blocking like the rest of the agent.

use std::future::Future;
use std::path::Path;

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region, SharedCredentialsProvider};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, Config};
use tokio::io::AsyncWriteExt;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use super::{ObjectRef, ObjectStore};
use crate::config::RemoteSettings;
use crate::error::{VaultError, VaultResult};

/// S3 store with a blocking API
///
/// Call it from a blocking context. From inside an async runtime, go through
/// `tokio::task::spawn_blocking`; a direct call returns a `Config` error.
pub struct S3Store {
    client: Client,
    runtime: Runtime,
}

impl S3Store {
    /// Build a client from static credentials and an optional custom endpoint
    pub fn new(cfg: &RemoteSettings) -> VaultResult<Self> {
        let mut builder = Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()));

        if let Some(endpoint) = &cfg.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        match (&cfg.access_key, &cfg.secret_key) {
            (Some(ak), Some(sk)) => {
                let creds = Credentials::new(ak, sk, None, None, "hostvault");
                builder = builder.credentials_provider(SharedCredentialsProvider::new(creds));
            }
            _ => {
                return Err(VaultError::Config(
                    "remote.access_key and remote.secret_key are required for the s3 backend"
                        .into(),
                ))
            }
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| VaultError::Config(format!("Failed to start I/O runtime: {}", e)))?;

        Ok(Self {
            client: Client::from_conf(builder.build()),
            runtime,
        })
    }

    /// Drive `fut` on the private runtime
    fn block_on<T>(&self, fut: impl Future<Output = VaultResult<T>>) -> VaultResult<T> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(VaultError::Config(
                "S3Store is blocking; call it via spawn_blocking inside an async runtime".into(),
            ));
        }
        self.runtime.block_on(fut)
    }
}

impl ObjectStore for S3Store {
    fn name(&self) -> &'static str {
        "s3"
    }

    fn put_file(&self, object: &ObjectRef, source: &Path) -> VaultResult<u64> {
        self.block_on(async {
            let size = tokio::fs::metadata(source)
                .await
                .map_err(|e| {
                    VaultError::transfer(
                        &object.key,
                        format!("cannot read {}: {}", source.display(), e),
                    )
                })?
                .len();
            let body = ByteStream::from_path(source)
                .await
                .map_err(|e| VaultError::transfer(&object.key, e))?;

            debug!(object = %object, size, "starting upload");
            self.client
                .put_object()
                .bucket(&object.bucket)
                .key(&object.key)
                .content_length(size as i64)
                .body(body)
                .send()
                .await
                .map_err(|e| VaultError::transfer(&object.key, DisplayErrorContext(&e)))?;

            info!(object = %object, bytes = size, "uploaded to s3");
            Ok::<u64, VaultError>(size)
        })
    }

    fn get_to_file(&self, object: &ObjectRef, destination: &Path) -> VaultResult<u64> {
        self.block_on(async {
            let output = self
                .client
                .get_object()
                .bucket(&object.bucket)
                .key(&object.key)
                .send()
                .await
                .map_err(|e| VaultError::transfer(&object.key, DisplayErrorContext(&e)))?;

            let fail = |e: std::io::Error| VaultError::transfer(&object.key, e);
            let mut body = output.body.into_async_read();
            let mut file = tokio::fs::File::create(destination).await.map_err(fail)?;
            let bytes = tokio::io::copy(&mut body, &mut file).await.map_err(fail)?;
            file.flush().await.map_err(fail)?;
            file.sync_all().await.map_err(fail)?;

            info!(object = %object, bytes, "downloaded from s3");
            Ok::<u64, VaultError>(bytes)
        })
    }

    fn exists(&self, object: &ObjectRef) -> VaultResult<bool> {
        self.block_on(async {
            match self
                .client
                .head_object()
                .bucket(&object.bucket)
                .key(&object.key)
                .send()
                .await
            {
                Ok(_) => Ok(true),
                Err(err) => {
                    if err.as_service_error().map_or(false, |e| e.is_not_found()) {
                        Ok(false)
                    } else {
                        Err(VaultError::transfer(&object.key, DisplayErrorContext(&err)))
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_rejected() {
        let cfg = RemoteSettings {
            bucket: "backups".into(),
            ..RemoteSettings::default()
        };
        let err = S3Store::new(&cfg).err().unwrap();
        assert!(matches!(err, VaultError::Config(_)));
    }

    fn local_settings() -> RemoteSettings {
        RemoteSettings {
            endpoint: Some("http://127.0.0.1:9000".into()),
            bucket: "backups".into(),
            access_key: Some("minio".into()),
            secret_key: Some("minio123".into()),
            ..RemoteSettings::default()
        }
    }

    #[test]
    fn test_call_inside_runtime_is_error_not_panic() {
        let store = S3Store::new(&local_settings()).unwrap();
        let outer = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        let err = outer
            .block_on(async { store.exists(&ObjectRef::new("backups", "a.tar.gz")) })
            .unwrap_err();
        assert!(matches!(err, VaultError::Config(_)));
    }

    #[test]
    fn test_builds_with_custom_endpoint() {
        let cfg = RemoteSettings {
            endpoint: Some("http://127.0.0.1:9000".into()),
            bucket: "backups".into(),
            access_key: Some("minio".into()),
            secret_key: Some("minio123".into()),
            ..RemoteSettings::default()
        };
        let store = S3Store::new(&cfg).unwrap();
        assert_eq!(store.name(), "s3");
    }
}
