//! Config CLI commands

use std::path::Path;

use clap::Subcommand;

use crate::config::Settings;
use crate::error::{VaultError, VaultResult};

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective settings (secrets redacted)
    Show,

    /// Write a default settings file if none exists
    Init,
}

/// Handle a config command
pub fn handle_config_command(
    settings_file: &Path,
    settings: &Settings,
    cmd: ConfigCommands,
) -> VaultResult<()> {
    match cmd {
        ConfigCommands::Show => {
            let yaml = serde_yaml::to_string(&settings.redacted())?;
            println!("Hostvault Configuration");
            println!("=======================");
            println!("Settings file: {}", settings_file.display());
            if !settings_file.exists() {
                println!("(not written yet, showing defaults)");
            }
            println!();
            print!("{}", yaml);
        }

        ConfigCommands::Init => {
            if settings_file.exists() {
                println!("Settings file already exists: {}", settings_file.display());
                return Ok(());
            }

            if let Some(parent) = settings_file.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    VaultError::Io(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
            Settings::default().save_to(settings_file)?;
            println!("Wrote default settings to {}", settings_file.display());
        }
    }

    Ok(())
}
