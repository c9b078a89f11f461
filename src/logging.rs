//! Log subscriber setup for the agent binary
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the binary.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingSettings};
use crate::error::{VaultError, VaultResult};

/// Install the global subscriber, writing to stderr
///
/// `RUST_LOG` takes precedence over `settings.level`.
pub fn init(settings: &LoggingSettings) -> VaultResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| {
            VaultError::Config(format!("Invalid log level '{}': {}", settings.level, e))
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match settings.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_target(false).try_init(),
    };

    installed.map_err(|e| VaultError::Config(format!("Failed to install log subscriber: {}", e)))
}
