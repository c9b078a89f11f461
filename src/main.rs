use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use hostvault::cli::{
    handle_backup_command, handle_config_command, BackupCommands, ConfigCommands, Overrides,
};
use hostvault::config::{Settings, VaultPaths};

#[derive(Parser)]
#[command(
    name = "hostvault",
    version,
    about = "Archive, restore and ship hosting backups",
    long_about = "Hostvault turns directory trees into compressed tar.gz archives in a \
                  local storage root, restores them, and moves them to and from an \
                  S3-compatible object store."
)]
struct Cli {
    /// Settings file (defaults to agent.yaml in the config directory)
    #[arg(long, global = true, env = "HOSTVAULT_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive management commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Settings commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_file = match cli.config {
        Some(path) => path,
        None => VaultPaths::new()?.settings_file(),
    };
    let mut settings = Settings::load_from(&settings_file)
        .with_context(|| format!("loading {}", settings_file.display()))?;
    cli.overrides.apply(&mut settings);

    hostvault::logging::init(&settings.logging)?;

    match cli.command {
        Commands::Backup(cmd) => handle_backup_command(&settings, cmd)?,
        Commands::Config(cmd) => handle_config_command(&settings_file, &settings, cmd)?,
    }

    Ok(())
}
