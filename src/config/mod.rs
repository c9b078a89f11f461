//! Configuration module for Hostvault
//!
//! This module provides configuration management including:
//! - Base directory resolution
//! - Agent settings (storage root, object store, retry, logging)

pub mod paths;
pub mod settings;

pub use paths::VaultPaths;
pub use settings::{LogFormat, LoggingSettings, RemoteBackend, RemoteSettings, RetrySettings, Settings};
