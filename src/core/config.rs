//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! The guestbook keeps one user-level config file with defaults the CLI
//! falls back to when flags and positional arguments are absent.
//!
//! # Locations
//!
//! Searched in order; the first existing file wins:
//! 1. `$GUESTBOOK_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/guestbook/config.toml` (the platform config dir)
//! 3. `~/.guestbook/config.toml`
//!
//! A missing config file is not an error; defaults apply.
//!
//! # Example
//!
//! ```toml
//! # ~/.guestbook/config.toml
//! default_project = "demo"
//! data_dir = "/var/lib/guestbook"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    Parse { path: PathBuf, message: String },
}

/// User-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Project used when no project argument is given.
    default_project: Option<String>,
    /// Directory holding persisted guestbook data.
    data_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error only when a config file exists but cannot be read
    /// or parsed. No file at any location yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        for path in Self::candidate_paths() {
            if path.is_file() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Project used when no project argument is given.
    pub fn default_project(&self) -> Option<&str> {
        self.default_project.as_deref()
    }

    /// Directory holding persisted guestbook data.
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(explicit) = std::env::var_os("GUESTBOOK_CONFIG") {
            paths.push(PathBuf::from(explicit));
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("guestbook").join("config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".guestbook").join("config.toml"));
        }
        paths
    }
}
