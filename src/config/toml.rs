//! TOML configuration file parsing

use super::cli::Cli;
use super::cli_convert::{convert_cancel_policy, parse_duration_ms};
use super::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    // Override dispatch settings
    if let Some(timeout) = &cli.timeout {
        config.dispatch.timeout_ms = parse_duration_ms(timeout)?;
    }
    if let Some(policy) = cli.cancel_policy {
        config.dispatch.cancel_policy = convert_cancel_policy(policy);
    }
    if cli.cancel_on_timeout {
        config.dispatch.cancel_on_timeout = true;
    }

    // Override logging settings
    if let Some(filter) = &cli.log_filter {
        config.logging.filter = filter.clone();
    }
    if cli.log_json {
        config.logging.json = true;
    }

    Ok(config)
}
