//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Values are validated after parsing: substitution caps must be positive and
//! bounded, and log levels must name a `tracing` level.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Upper bound accepted for `max_substitutions`.
pub const MAX_SUBSTITUTIONS_LIMIT: u32 = 100;

/// Log levels accepted in `[logging] level`.
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Engine configuration file.
///
/// # Example
///
/// ```toml
/// strict = true
/// max_substitutions = 10
///
/// [logging]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Promote routing errors to failures instead of falling back.
    pub strict: Option<bool>,

    /// Cap on interceptor `ReplaceWith` chains per instruction.
    pub max_substitutions: Option<u32>,

    /// Logging defaults
    pub logging: Option<LoggingConfig>,
}

impl EngineConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(max) = self.max_substitutions {
            if max == 0 || max > MAX_SUBSTITUTIONS_LIMIT {
                return Err(ConfigError::InvalidValue(format!(
                    "max_substitutions must be between 1 and {MAX_SUBSTITUTIONS_LIMIT}, got {max}"
                )));
            }
        }

        if let Some(logging) = &self.logging {
            logging.validate()?;
        }

        Ok(())
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default level when no `WF_LOG` filter is set
    pub level: Option<String>,
}

impl LoggingConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the level is unknown.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(level) = &self.level {
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid log level '{}', must be one of: {}",
                    level,
                    LOG_LEVELS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn parse_full_config() {
        let config: EngineConfig = toml::from_str(
            r#"
            strict = true
            max_substitutions = 5

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.strict, Some(true));
        assert_eq!(config.max_substitutions, Some(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_substitutions_rejected() {
        let config = EngineConfig {
            max_substitutions: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_log_level_rejected() {
        let config = EngineConfig {
            logging: Some(LoggingConfig {
                level: Some("loud".to_string()),
            }),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("invalid log level"));
    }

    #[test]
    fn unknown_fields_rejected() {
        let parsed: Result<EngineConfig, _> = toml::from_str("strictness = true");
        assert!(parsed.is_err());
    }
}
