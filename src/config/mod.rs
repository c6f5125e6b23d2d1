//! Configuration management for lexicheck

mod io;
mod types;

pub use types::*;

use anyhow::Result;
use std::path::{Path, PathBuf};

impl Config {
    /// Get the config file path (~/.config/lexicheck/config.toml)
    pub fn config_path() -> Result<PathBuf> {
        io::config_path()
    }

    /// Get the config directory path (~/.config/lexicheck)
    pub fn config_dir() -> Result<PathBuf> {
        io::config_dir()
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> Result<Self> {
        io::load()
    }

    /// Load configuration from an explicit path, or return defaults if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        io::load_from(path)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        io::save_to(self, path)
    }

    /// Whether model-backed grammar checking is switched on
    pub fn grammar_enabled(&self) -> bool {
        self.features.enabled && self.features.grammar
    }

    /// Whether model-backed error analysis is switched on
    pub fn error_analysis_enabled(&self) -> bool {
        self.features.enabled && self.features.error_analysis
    }

    /// Whether model-backed tone analysis is switched on
    pub fn tone_enabled(&self) -> bool {
        self.features.enabled && self.features.tone
    }
}
