//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order, the first existing file wins:
//! 1. `$WAYFINDER_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/wayfinder/config.toml`
//! 3. `~/.wayfinder/config.toml` (canonical write location)
//!
//! Missing files are not an error; defaults apply.
//!
//! # Example
//!
//! ```no_run
//! use wayfinder::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! let options = config.navigator_options();
//! println!("strict: {}", options.strict);
//! ```

pub mod schema;

pub use schema::{EngineConfig, LoggingConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use crate::engine::DEFAULT_MAX_SUBSTITUTIONS;
use crate::engine::NavigatorOptions;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "WAYFINDER_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents (defaults if no file was found)
    pub engine: EngineConfig,
    /// Path of the loaded file
    loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed
    /// or validated.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_first(&Self::search_paths())
    }

    /// Load the first existing file among `candidates`.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read, parsed or
    /// validated.
    pub fn load_first(candidates: &[PathBuf]) -> Result<Self, ConfigError> {
        match candidates.iter().find(|path| path.exists()) {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let engine: EngineConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        engine.validate()?;

        Ok(Self {
            engine,
            loaded_from: Some(path.to_path_buf()),
        })
    }

    /// Candidate config locations, in search order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_home).join("wayfinder/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".wayfinder/config.toml"));
        }
        paths
    }

    /// Get the canonical config path (`~/.wayfinder/config.toml`).
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".wayfinder/config.toml"))
    }

    /// Write configuration atomically.
    ///
    /// Creates parent directories if needed, writes a temp file next to the
    /// target and renames it into place.
    pub fn write(path: &Path, engine: &EngineConfig) -> Result<(), ConfigError> {
        engine.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(engine).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;
        file.write_all(contents.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Whether strict mode is enabled. Defaults to `false`.
    pub fn strict(&self) -> bool {
        self.engine.strict.unwrap_or(false)
    }

    /// Interceptor substitution cap. Defaults to 10.
    pub fn max_substitutions(&self) -> u32 {
        self.engine
            .max_substitutions
            .unwrap_or(DEFAULT_MAX_SUBSTITUTIONS)
    }

    /// Default log level. Defaults to `warn`.
    pub fn log_level(&self) -> &str {
        self.engine
            .logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or("warn")
    }

    /// Path of the loaded file, if any.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }

    /// Runtime options for a [`crate::engine::Navigator`].
    pub fn navigator_options(&self) -> NavigatorOptions {
        NavigatorOptions {
            strict: self.strict(),
            max_substitutions: self.max_substitutions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_nothing_found() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_first(&[temp.path().join("missing.toml")]).unwrap();
        assert!(!config.strict());
        assert_eq!(config.max_substitutions(), DEFAULT_MAX_SUBSTITUTIONS);
        assert_eq!(config.log_level(), "warn");
        assert!(config.loaded_from().is_none());
    }

    #[test]
    fn first_existing_file_wins() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("first.toml");
        let second = temp.path().join("second.toml");
        fs::write(&second, "strict = true").unwrap();

        let config = Config::load_first(&[first, second.clone()]).unwrap();
        assert!(config.strict());
        assert_eq!(config.loaded_from(), Some(second.as_path()));
    }

    #[test]
    fn invalid_values_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_substitutions = 1000").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "strict = [").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn write_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");
        let engine = EngineConfig {
            strict: Some(true),
            max_substitutions: Some(4),
            logging: Some(LoggingConfig {
                level: Some("debug".to_string()),
            }),
        };
        Config::write(&path, &engine).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.engine, engine);
        let options = config.navigator_options();
        assert!(options.strict);
        assert_eq!(options.max_substitutions, 4);
        assert_eq!(config.log_level(), "debug");
    }
}
