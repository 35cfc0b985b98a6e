//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list` and `config path` for
//! viewing and modifying settings from the command line.

use clap::Subcommand;
use seatplan::config::ConfigKey;

use crate::error::CliError;
use crate::runner::ConfigSource;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., hardware.baud_rate)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., hardware.baud_rate)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, source: &ConfigSource) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(source, &key),
        ConfigCommands::Set { key, value } => run_set(source, &key, &value),
        ConfigCommands::List => run_list(source),
        ConfigCommands::Path => {
            println!("{}", source.path().display());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'seatplan config list' to see available keys.",
            key
        ))
    })
}

fn run_get(source: &ConfigSource, key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = source.load()?;
    let value = config_key.get(&config);

    if value.is_empty() {
        println!("(not set)");
    } else {
        println!("{}", value);
    }
    Ok(())
}

fn run_set(source: &ConfigSource, key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;

    let mut config = source.load()?;
    config_key
        .set(&mut config, value)
        .map_err(|e| CliError::Config(e.to_string()))?;
    config.save_to(&source.path())?;

    println!("Set {} = {}", config_key.name(), value);
    Ok(())
}

fn run_list(source: &ConfigSource) -> Result<(), CliError> {
    let config = source.load()?;

    println!("Configuration Settings");
    println!("======================");
    println!();

    let mut current_section = "";

    for key in ConfigKey::all() {
        let section = key.section();

        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }

        let value = key.get(&config);
        if value.is_empty() {
            println!("  {} = (not set)", key.key_name());
        } else {
            println!("  {} = {}", key.key_name(), value);
        }
    }

    Ok(())
}
