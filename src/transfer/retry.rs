//! Retry decorator for object stores

use std::path::Path;
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use tracing::warn;

use super::{ObjectRef, ObjectStore};
use crate::config::RetrySettings;
use crate::error::{VaultError, VaultResult};

/// Retries transient failures of the wrapped store with exponential backoff
///
/// Only [`VaultError::Transfer`] counts as transient; validation and local
/// errors fail on the first attempt.
pub struct Retrying<S> {
    inner: S,
    policy: RetrySettings,
}

impl<S: ObjectStore> Retrying<S> {
    pub fn new(inner: S, policy: RetrySettings) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.policy.initial_backoff_ms))
            .with_max_interval(Duration::from_millis(self.policy.max_backoff_ms))
            .with_max_elapsed_time(None)
            .build()
    }

    fn run<T>(
        &self,
        operation: &str,
        object: &ObjectRef,
        mut call: impl FnMut() -> VaultResult<T>,
    ) -> VaultResult<T> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;

        let op = || {
            attempt += 1;
            match call() {
                Ok(value) => Ok(value),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    Err(backoff::Error::transient(err))
                }
                Err(err) => Err(backoff::Error::permanent(err)),
            }
        };
        let notify = |err: VaultError, wait: Duration| {
            warn!(
                operation,
                object = %object,
                error = %err,
                retry_in_ms = wait.as_millis() as u64,
                "transfer failed, retrying"
            );
        };

        backoff::retry_notify(self.backoff(), op, notify).map_err(|e| match e {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => err,
        })
    }
}

impl<S: ObjectStore> ObjectStore for Retrying<S> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn put_file(&self, object: &ObjectRef, source: &Path) -> VaultResult<u64> {
        self.run("upload", object, || self.inner.put_file(object, source))
    }

    fn get_to_file(&self, object: &ObjectRef, destination: &Path) -> VaultResult<u64> {
        self.run("download", object, || {
            self.inner.get_to_file(object, destination)
        })
    }

    fn exists(&self, object: &ObjectRef) -> VaultResult<bool> {
        self.run("head", object, || self.inner.exists(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with a transfer error until `failures` calls have been made
    struct FlakyStore {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }

        fn attempt(&self, key: &str) -> VaultResult<u64> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                Err(VaultError::transfer(key, "connection reset"))
            } else {
                Ok(42)
            }
        }
    }

    impl ObjectStore for FlakyStore {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn put_file(&self, object: &ObjectRef, _source: &Path) -> VaultResult<u64> {
            self.attempt(&object.key)
        }

        fn get_to_file(&self, object: &ObjectRef, _destination: &Path) -> VaultResult<u64> {
            self.attempt(&object.key)
        }

        fn exists(&self, _object: &ObjectRef) -> VaultResult<bool> {
            Err(VaultError::Validation("bad bucket".into()))
        }
    }

    fn fast_policy(max_attempts: u32) -> RetrySettings {
        RetrySettings {
            max_attempts,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
        }
    }

    #[test]
    fn test_recovers_within_budget() {
        let store = Retrying::new(FlakyStore::new(2), fast_policy(3));
        let object = ObjectRef::new("b", "k");

        assert_eq!(store.put_file(&object, Path::new("unused")).unwrap(), 42);
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let store = Retrying::new(FlakyStore::new(10), fast_policy(3));
        let object = ObjectRef::new("b", "k");

        let err = store.get_to_file(&object, Path::new("unused")).unwrap_err();
        assert!(err.is_transient());
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_permanent_errors_are_not_retried() {
        let store = Retrying::new(FlakyStore::new(0), fast_policy(5));
        let err = store.exists(&ObjectRef::new("b", "k")).unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));
    }
}
