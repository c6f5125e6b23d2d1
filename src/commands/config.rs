//! Config subcommands handler

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use lexicheck::Config;

use super::load_config;

/// Show current configuration as TOML.
#[cfg(not(tarpaulin_include))]
pub fn handle_show(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    print!("{}", render_config(&config)?);
    Ok(())
}

/// Print the configuration file path.
#[cfg(not(tarpaulin_include))]
pub fn handle_path(path: Option<&Path>) -> Result<()> {
    println!("{}", resolve_path(path)?.display());
    Ok(())
}

/// Reset the config file to defaults, backing up the current one.
#[cfg(not(tarpaulin_include))]
pub fn handle_reset(path: Option<&Path>) -> Result<()> {
    let path = resolve_path(path)?;
    if let Some(backup) = reset_config(&path)? {
        println!("Backed up to {}", backup.display());
    }
    println!("Config reset to defaults: {}", path.display());
    Ok(())
}

/// Write defaults to `path`. Returns the backup path when a file existed.
pub(crate) fn reset_config(path: &Path) -> Result<Option<PathBuf>> {
    let backup = if path.exists() {
        let mut backup = path.with_extension("toml.bak");
        let mut counter = 1u32;
        while backup.exists() {
            backup = path.with_extension(format!("toml.bak.{}", counter));
            counter += 1;
        }
        fs::copy(path, &backup)
            .with_context(|| format!("Failed to back up config to {}", backup.display()))?;
        Some(backup)
    } else {
        None
    };

    Config::default().save_to(path)?;
    Ok(backup)
}

/// Render a configuration as pretty TOML.
pub(crate) fn render_config(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize config")
}

/// The file `config show` reads: the explicit path, or the default location.
pub(crate) fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::config_path(),
    }
}
