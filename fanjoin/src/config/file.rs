//! Configuration file handling for ~/.fanjoin/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in `parser`, and serialization in `writer`.

use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::settings::ConfigFile;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.fanjoin/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Write the default config file to `path` unless one exists.
    ///
    /// Returns true if a file was written.
    pub fn ensure_exists_at(path: &Path) -> Result<bool, ConfigFileError> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }
}

/// Get the path to the config directory (~/.fanjoin).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fanjoin")
}

/// Get the path to the config file (~/.fanjoin/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use crate::outcome::Branch;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.pool.workers, 3);
        assert_eq!(config.combine.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.threshold.min_completed, 10);
        assert_eq!(config.threshold.max_failure_ratio, 0.5);
        assert!(config.simulation.seed.is_none());
        assert!(config.logging.file.ends_with(".fanjoin/fanjoin.log"));
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let config = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_ensure_exists_at_writes_once() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        assert!(ConfigFile::ensure_exists_at(&config_path).unwrap());
        std::fs::write(&config_path, "[pool]\nworkers = 9\n").unwrap();
        assert!(!ConfigFile::ensure_exists_at(&config_path).unwrap());
        assert_eq!(ConfigFile::load_from(&config_path).unwrap().pool.workers, 9);
    }

    #[test]
    fn test_lifecycle_config_mapping() {
        let mut config = ConfigFile::default();
        config.combine.timeout_ms = 400;
        config.threshold.min_completed = 3;

        let lifecycle = config.lifecycle_config();
        assert_eq!(lifecycle.workers, 3);
        assert_eq!(lifecycle.combine.timeout, Duration::from_millis(400));
        assert_eq!(lifecycle.combine.threshold.min_completed, 3);
    }

    #[test]
    fn test_simulation_config_per_branch() {
        let mut config = ConfigFile::default();
        config.simulation.seed = Some(10);

        let f = config.simulation_config(Branch::F);
        let g = config.simulation_config(Branch::G);
        assert_eq!(f.base_delay, Duration::from_millis(DEFAULT_F_DELAY_MS));
        assert_eq!(g.base_delay, Duration::from_millis(DEFAULT_G_DELAY_MS));
        assert_eq!(f.seed, Some(10));
        assert_eq!(g.seed, Some(11));
        assert_eq!(f.slow_delay, Duration::from_millis(1500));
    }
}
