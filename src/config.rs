//! # Configuration Module
//!
//! Runtime configuration read from the environment (and a `.env` file when
//! present).
//!
//! | variable                         | default        |
//! |----------------------------------|----------------|
//! | `DATABASE_URL`                   | unset          |
//! | `MEAL_PATCH_STATE_DIR`           | `.meal-patch`  |
//! | `INTERPRETER_URL`                | unset          |
//! | `INTERPRETER_API_KEY`            | unset          |
//! | `INTERPRETER_TIMEOUT_SECS`       | `30`           |
//! | `INTERPRETER_MAX_RETRIES`        | `3`            |
//! | `INTERPRETER_BREAKER_THRESHOLD`  | `5`            |
//! | `INTERPRETER_BREAKER_RESET_SECS` | `60`           |

use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_STATE_DIR: &str = ".meal-patch";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Retry and circuit breaker settings for calls to external services
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts after the first try
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay_ms: 500,  // 0.5 seconds
            max_retry_delay_ms: 10000, // 10 seconds
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

/// Connection settings for the interpretation service
#[derive(Debug, Clone, PartialEq)]
pub struct InterpreterConfig {
    /// Endpoint receiving interpretation requests; `None` disables free-text edits
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub recovery: RecoveryConfig,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            recovery: RecoveryConfig::default(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// PostgreSQL connection string; `None` keeps state in snapshot files only
    pub database_url: Option<String>,
    /// Directory holding plan state snapshots
    pub state_dir: PathBuf,
    pub interpreter: InterpreterConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            interpreter: InterpreterConfig::default(),
        }
    }
}

/// Errors raised while reading configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    InvalidValue { key: String, value: String },
    /// Values parse but do not make sense together
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Configuration error: invalid value '{value}' for {key}")
            }
            ConfigError::Invalid(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl EngineConfig {
    /// Load configuration from the process environment, reading `.env` first
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = EngineConfig::default();

        let recovery = RecoveryConfig {
            max_retries: parse_or(&text, "INTERPRETER_MAX_RETRIES", defaults.interpreter.recovery.max_retries)?,
            circuit_breaker_threshold: parse_or(
                &text,
                "INTERPRETER_BREAKER_THRESHOLD",
                defaults.interpreter.recovery.circuit_breaker_threshold,
            )?,
            circuit_breaker_reset_secs: parse_or(
                &text,
                "INTERPRETER_BREAKER_RESET_SECS",
                defaults.interpreter.recovery.circuit_breaker_reset_secs,
            )?,
            ..defaults.interpreter.recovery.clone()
        };

        let config = Self {
            database_url: text("DATABASE_URL"),
            state_dir: text("MEAL_PATCH_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_dir),
            interpreter: InterpreterConfig {
                endpoint: text("INTERPRETER_URL"),
                api_key: text("INTERPRETER_API_KEY"),
                timeout_secs: parse_or(&text, "INTERPRETER_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
                recovery,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that values make sense together
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interpreter.timeout_secs == 0 {
            return Err(ConfigError::Invalid("interpreter timeout must be positive".to_string()));
        }
        let recovery = &self.interpreter.recovery;
        if recovery.circuit_breaker_threshold == 0 {
            return Err(ConfigError::Invalid(
                "circuit breaker threshold must be positive".to_string(),
            ));
        }
        if recovery.base_retry_delay_ms > recovery.max_retry_delay_ms {
            return Err(ConfigError::Invalid(
                "base retry delay exceeds maximum retry delay".to_string(),
            ));
        }
        if let Some(endpoint) = &self.interpreter.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    key: "INTERPRETER_URL".to_string(),
                    value: endpoint.clone(),
                });
            }
        }
        Ok(())
    }
}

fn parse_or<T: FromStr>(
    text: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match text(key) {
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.state_dir, PathBuf::from(".meal-patch"));
        assert!(config.interpreter.endpoint.is_none());
    }

    #[test]
    fn test_values_read_from_lookup() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/meals"),
            ("MEAL_PATCH_STATE_DIR", "/tmp/plans"),
            ("INTERPRETER_URL", "https://interpreter.local/v1/edits"),
            ("INTERPRETER_API_KEY", "secret"),
            ("INTERPRETER_TIMEOUT_SECS", "5"),
            ("INTERPRETER_MAX_RETRIES", "1"),
            ("INTERPRETER_BREAKER_THRESHOLD", "2"),
        ]))
        .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/meals"));
        assert_eq!(config.state_dir, PathBuf::from("/tmp/plans"));
        assert_eq!(config.interpreter.api_key.as_deref(), Some("secret"));
        assert_eq!(config.interpreter.timeout_secs, 5);
        assert_eq!(config.interpreter.recovery.max_retries, 1);
        assert_eq!(config.interpreter.recovery.circuit_breaker_threshold, 2);
        assert_eq!(config.interpreter.recovery.circuit_breaker_reset_secs, 60);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = EngineConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = EngineConfig::from_lookup(lookup(&[("INTERPRETER_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "INTERPRETER_TIMEOUT_SECS".to_string(),
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn test_inconsistent_values_rejected() {
        assert!(EngineConfig::from_lookup(lookup(&[("INTERPRETER_TIMEOUT_SECS", "0")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[("INTERPRETER_BREAKER_THRESHOLD", "0")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[("INTERPRETER_URL", "ftp://nope")])).is_err());
    }

    #[test]
    fn test_recovery_config_defaults() {
        let recovery = RecoveryConfig::default();
        assert!(recovery.max_retries <= 10);
        assert!(recovery.base_retry_delay_ms <= recovery.max_retry_delay_ms);
        assert!(recovery.circuit_breaker_threshold > 0);
    }
}
