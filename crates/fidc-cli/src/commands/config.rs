//! `fidc config` command implementation
//!
//! Reads the layered configuration and edits the config file.

use crate::config::{Config, CONFIG_KEYS};
use crate::error::Result;
use colored::Colorize;
use std::path::Path;

/// Print the effective value of one setting
pub fn get(config: &Config, key: &str) -> Result<()> {
    println!("{}", config.get(key)?);
    Ok(())
}

/// Persist one setting to the config file at `path`
///
/// Only the file is changed; environment overrides still win when set.
pub fn set(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut config = Config::from_file(path)?.unwrap_or_default();
    config.set(key, value)?;
    config.save(path)?;

    println!(
        "{} Set {} = {} in {}",
        "✓".green(),
        key,
        config.get(key)?,
        path.display()
    );
    Ok(())
}

/// Show all effective settings
pub fn show(config: &Config, path: &Path) -> Result<()> {
    println!("{}", "FIDC CLI Configuration:".cyan().bold());
    println!();
    for key in CONFIG_KEYS {
        println!("{:<20} {}", format!("{}:", key), config.get(key)?);
    }
    println!();
    println!("{:<20} {}", "config file:", path.display());
    println!();
    println!("{}", "Environment Variables:".cyan());
    for key in CONFIG_KEYS {
        println!("  {}", format_env_var(key));
    }

    Ok(())
}

/// Format config key as environment variable name
fn format_env_var(key: &str) -> String {
    format!("FIDC_{}", key.to_uppercase())
}
