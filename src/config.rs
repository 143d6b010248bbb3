//! Supervised-run configuration file support
//!
//! A supervised instance has no command line and no console, so its
//! logging setup comes from an optional TOML file. A missing file is
//! not an error; defaults apply.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration applied to supervised runs, loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log file path (empty = no file logging)
    pub log_file: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: String::new(),
        }
    }
}

impl RunConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().to_string_lossy().to_string(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Load configuration from default locations for a service name.
    ///
    /// Searches in order:
    /// 1. Same directory as the executable: `<name>.toml`
    /// 2. Platform config directory: `<config_dir>/<name>/config.toml`
    ///
    /// Falls back to defaults when no file exists.
    pub fn load_default(name: &str) -> Result<Self, ConfigError> {
        for candidate in Self::default_paths(name) {
            if candidate.exists() {
                return Self::load(&candidate);
            }
        }
        Ok(Self::default())
    }

    fn default_paths(name: &str) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                paths.push(exe_dir.join(format!("{name}.toml")));
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(name).join("config.toml"));
        }
        paths
    }
}

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the config file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Error parsing TOML
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}
