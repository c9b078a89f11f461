//! Agent settings for Hostvault
//!
//! Loaded from `agent.yaml`. Every field has a default, so a missing file or
//! a partial file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::VaultError;
use crate::storage::file_io::write_atomic;

/// Which object store backs remote transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemoteBackend {
    /// S3-compatible endpoint (AWS, MinIO, R2, ...)
    #[default]
    S3,
    /// Plain directory, e.g. a mounted NAS share
    Local,
}

/// Object store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    #[serde(default)]
    pub backend: RemoteBackend,

    /// Custom endpoint; unset means the AWS default for the region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    /// Default bucket for uploads and downloads
    #[serde(default)]
    pub bucket: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// Root directory for the `local` backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_root: Option<PathBuf>,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            backend: RemoteBackend::default(),
            endpoint: None,
            region: default_region(),
            bucket: String::new(),
            access_key: None,
            secret_key: None,
            local_root: None,
        }
    }
}

impl RemoteSettings {
    /// Copy with credentials masked, for display
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "********".to_string());
        Self {
            access_key: mask(&self.access_key),
            secret_key: mask(&self.secret_key),
            ..self.clone()
        }
    }
}

/// Retry policy for remote transfers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per transfer; 1 disables retrying
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding local archives
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,

    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("/var/backups")
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            remote: RemoteSettings::default(),
            retry: RetrySettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a specific file, or defaults if absent
    pub fn load_from(path: &Path) -> Result<Self, VaultError> {
        if !path.exists() {
            // Don't save yet - let caller decide when to persist
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| VaultError::Io(format!("Failed to read settings file: {}", e)))?;

        serde_yaml::from_str(&contents).map_err(|e| {
            VaultError::Config(format!(
                "Failed to parse settings file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Save settings to a file atomically
    pub fn save_to(&self, path: &Path) -> Result<(), VaultError> {
        let contents = serde_yaml::to_string(self)
            .map_err(|e| VaultError::Config(format!("Failed to serialize settings: {}", e)))?;
        write_atomic(path, contents.as_bytes())
    }

    /// Copy safe to print
    pub fn redacted(&self) -> Self {
        Self {
            remote: self.remote.redacted(),
            ..self.clone()
        }
    }
}
