//! Path management for Hostvault
//!
//! ## Path Resolution Order
//!
//! 1. `HOSTVAULT_HOME` environment variable (if set)
//! 2. The platform config directory (`~/.config/hostvault` on Linux)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::VaultError;

/// Environment variable overriding the base directory
pub const HOME_ENV: &str = "HOSTVAULT_HOME";

/// Manages the paths used by Hostvault
#[derive(Debug, Clone)]
pub struct VaultPaths {
    /// Base directory for Hostvault configuration
    base_dir: PathBuf,
}

impl VaultPaths {
    /// Create a new VaultPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, VaultError> {
        let base_dir = if let Ok(custom) = std::env::var(HOME_ENV) {
            PathBuf::from(custom)
        } else {
            ProjectDirs::from("", "", "hostvault")
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or_else(|| {
                    VaultError::Config("Could not determine a configuration directory".into())
                })?
        };

        Ok(Self { base_dir })
    }

    /// Create VaultPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("agent.yaml")
    }
}
