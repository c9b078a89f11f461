//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup manager.

pub mod backup;
pub mod config;

use std::path::PathBuf;

use clap::Args;

use crate::config::Settings;

pub use backup::{handle_backup_command, BackupCommands};
pub use config::{handle_config_command, ConfigCommands};

/// Flags and environment variables that override the settings file
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Directory holding local archives
    #[arg(long, global = true, env = "HOSTVAULT_STORAGE_ROOT")]
    pub storage_root: Option<PathBuf>,

    /// S3-compatible endpoint URL
    #[arg(long, global = true, env = "HOSTVAULT_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// Default bucket
    #[arg(long, global = true, env = "HOSTVAULT_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    #[arg(long, global = true, env = "HOSTVAULT_S3_REGION")]
    pub s3_region: Option<String>,

    #[arg(long, global = true, env = "HOSTVAULT_S3_ACCESS_KEY", hide_env_values = true)]
    pub s3_access_key: Option<String>,

    #[arg(long, global = true, env = "HOSTVAULT_S3_SECRET_KEY", hide_env_values = true)]
    pub s3_secret_key: Option<String>,
}

impl Overrides {
    /// Apply every override that is set
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(root) = &self.storage_root {
            settings.storage_root = root.clone();
        }
        if let Some(endpoint) = &self.s3_endpoint {
            settings.remote.endpoint = Some(endpoint.clone());
        }
        if let Some(bucket) = &self.s3_bucket {
            settings.remote.bucket = bucket.clone();
        }
        if let Some(region) = &self.s3_region {
            settings.remote.region = region.clone();
        }
        if let Some(access_key) = &self.s3_access_key {
            settings.remote.access_key = Some(access_key.clone());
        }
        if let Some(secret_key) = &self.s3_secret_key {
            settings.remote.secret_key = Some(secret_key.clone());
        }
    }
}
