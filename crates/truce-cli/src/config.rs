//! # Config Subcommand
//!
//! Validates engine configuration files and prints the defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use truce_dispute::EngineConfig;

/// Arguments for the config subcommand.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration operations.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Parse and validate an engine configuration file.
    Check {
        /// Path to the YAML (or JSON) configuration.
        file: PathBuf,
    },
    /// Print the default configuration as YAML.
    Defaults,
}

/// Execute the config subcommand.
pub fn run_config(args: &ConfigArgs) -> Result<u8> {
    match &args.command {
        ConfigCommand::Check { file } => match check(file) {
            Ok(_) => {
                println!("OK: {} is a valid engine configuration", file.display());
                Ok(0)
            }
            Err(e) => {
                println!("INVALID: {e:#}");
                Ok(1)
            }
        },
        ConfigCommand::Defaults => {
            print!("{}", EngineConfig::default().to_yaml()?);
            Ok(0)
        }
    }
}

/// Load and validate a configuration file.
pub fn check(file: &Path) -> Result<EngineConfig> {
    EngineConfig::from_path(file).with_context(|| format!("{}", file.display()))
}

/// The configuration a command runs with: the file at `path` when given,
/// the defaults otherwise.
pub fn load_or_default(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => check(path),
        None => Ok(EngineConfig::default()),
    }
}
