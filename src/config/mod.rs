//! Runtime configuration for the guard.
//!
//! This module provides the configuration infrastructure for `browser-guard`,
//! including:
//!
//! - [`GuardConfig`] – the resolved configuration consulted by every subsystem
//! - [`GuardConfigBuilder`] – builder for constructing a config from files,
//!   environment variables, and code-level overrides
//! - [`GuardMode`] – enumeration of top-level failure behaviors (`block` / `warn`)
//!
//! ## Configuration hierarchy
//!
//! Configuration is resolved in the following order (later wins):
//!
//! 1. Compiled defaults (secure by default — [`GuardMode::Block`])
//! 2. Global config file (`browser-guard.toml`, `.yaml`, or `.json`)
//! 3. Environment variables (`BROWSER_GUARD_*`)
//! 4. Request-level overrides are not modeled here; callers apply them after
//!    `build()` by constructing a modified copy.
//!
//! ## Example
//!
//! ```rust,ignore
//! use browser_guard::config::GuardConfigBuilder;
//!
//! let config = GuardConfigBuilder::new()
//!     .with_file("config/browser-guard.toml")?
//!     .with_env()
//!     .build()?;
//!
//! assert!(config.enabled);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

/// Errors that can occur while resolving guard configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file at {path}: {source}")]
    FileRead {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse configuration.
    #[error("failed to parse {format} config: {source}")]
    ParseError {
        /// Format that failed to parse (YAML, TOML, JSON).
        format: String,
        /// Underlying parse error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Unsupported or unrecognized configuration file extension.
    #[error("unsupported config file format: {message}")]
    UnsupportedFormat {
        /// Description of the problem.
        message: String,
    },

    /// Configuration validation failed.
    #[error("config validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Environment variable parsing error.
    #[error("failed to parse environment variable {key}: {message}")]
    EnvParse {
        /// Environment variable key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Top-level behavior when the policy engine or HTTP filter denies something.
///
/// `FromStr` lower-cases its input before matching, so configuration sourced
/// from files or environment variables never silently falls through on a
/// case mismatch (`Block`, `BLOCK`, and `block` are all accepted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardMode {
    /// Denies are enforced: the mediator returns `allow: false`.
    Block,
    /// Denies are logged but converted to passes (audit-only mode).
    Warn,
}

impl Default for GuardMode {
    fn default() -> Self {
        Self::Block // secure by default
    }
}

impl FromStr for GuardMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "warn" => Ok(Self::Warn),
            other => Err(format!("must be 'block' or 'warn', got '{other}'")),
        }
    }
}

/// Per-task-type default depth and timeout bounds, overridable by the
/// intent parser's `ParseOptions`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaskDefaults {
    /// Maximum navigation depth.
    pub max_depth: u32,
    /// Maximum wall-clock execution time, in milliseconds.
    pub timeout_ms: u64,
}

/// Main guard configuration.
///
/// `#[serde(default)]` lets a config file override only the fields it
/// mentions; anything absent falls back to [`GuardConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GuardConfig {
    /// Config schema version, for compatibility tracking.
    #[validate(length(min = 1))]
    pub version: String,

    /// Global enable/disable flag. When `false`, the mediator passes every
    /// tool call through unchecked (used only for explicit opt-out testing).
    pub enabled: bool,

    /// Behavior when policy or HTTP-filter checks deny something.
    pub mode: GuardMode,

    /// Hard ceiling on `intent.timeout_ms`, regardless of task-type default.
    #[validate(range(max = 300_000))]
    pub default_timeout_cap_ms: u64,

    /// Hard ceiling on `intent.max_depth`, regardless of task-type default.
    pub default_max_depth_cap: u32,

    /// Whether the HTTP filter's predicted allowlist layer is active by
    /// default for filters built via `filter_from_intent`.
    pub predicted_allowlist_enabled: bool,

    /// Request timeout for an OpenAI-shaped `LlmProvider`, in milliseconds.
    pub llm_openai_timeout_ms: u64,

    /// Request timeout for an Anthropic-shaped `LlmProvider`, in milliseconds.
    pub llm_anthropic_timeout_ms: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            enabled: true,
            mode: GuardMode::Block,
            default_timeout_cap_ms: 300_000,
            default_max_depth_cap: 10,
            predicted_allowlist_enabled: true,
            llm_openai_timeout_ms: 60_000,
            llm_anthropic_timeout_ms: 120_000,
        }
    }
}

/// Builder for constructing a [`GuardConfig`] from multiple sources.
#[derive(Debug, Default)]
pub struct GuardConfigBuilder {
    base: GuardConfig,
    use_env: bool,
}

impl GuardConfigBuilder {
    /// Create a new builder seeded with secure defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: GuardConfig::default(),
            use_env: false,
        }
    }

    /// Load configuration from a file (YAML, TOML, or JSON), replacing the
    /// current base.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: GuardConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                    format: "YAML".to_string(),
                    source: Box::new(e),
                })?
            }
            Some("toml") => toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                format: "TOML".to_string(),
                source: Box::new(e),
            })?,
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
                    format: "JSON".to_string(),
                    source: Box::new(e),
                })?
            }
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    message: "file extension must be .yaml, .yml, .toml, or .json".to_string(),
                });
            }
        };

        self.base = config;
        Ok(self)
    }

    /// Enable loading overrides from environment variables.
    ///
    /// Looks for variables prefixed with `BROWSER_GUARD_`, e.g.:
    /// - `BROWSER_GUARD_ENABLED=false`
    /// - `BROWSER_GUARD_MODE=warn`
    #[must_use]
    pub fn with_env(mut self) -> Self {
        self.use_env = true;
        self
    }

    /// Build the final configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation fails or an environment
    /// variable holds an unparsable value.
    pub fn build(mut self) -> Result<GuardConfig, ConfigError> {
        if self.use_env {
            dotenvy::dotenv().ok(); // load .env if present, ignore absence

            if let Ok(enabled) = std::env::var("BROWSER_GUARD_ENABLED") {
                self.base.enabled = enabled.parse().map_err(|_| ConfigError::EnvParse {
                    key: "BROWSER_GUARD_ENABLED".to_string(),
                    message: "must be 'true' or 'false'".to_string(),
                })?;
            }

            if let Ok(mode) = std::env::var("BROWSER_GUARD_MODE") {
                self.base.mode = mode.parse().map_err(|message| ConfigError::EnvParse {
                    key: "BROWSER_GUARD_MODE".to_string(),
                    message,
                })?;
            }

            if let Ok(timeout) = std::env::var("BROWSER_GUARD_TIMEOUT_CAP_MS") {
                self.base.default_timeout_cap_ms =
                    timeout.parse().map_err(|_| ConfigError::EnvParse {
                        key: "BROWSER_GUARD_TIMEOUT_CAP_MS".to_string(),
                        message: "must be an integer number of milliseconds".to_string(),
                    })?;
            }
        }

        self.base.validate()?;
        Ok(self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_secure() {
        let config = GuardConfig::default();
        assert!(config.enabled);
        assert_eq!(config.mode, GuardMode::Block);
        assert_eq!(config.default_timeout_cap_ms, 300_000);
    }

    #[test]
    fn builder_without_overrides_matches_default() {
        let config = GuardConfigBuilder::new().build().unwrap();
        assert!(config.enabled);
        assert_eq!(config.mode, GuardMode::Block);
    }

    #[test]
    fn mode_from_str_is_case_insensitive() {
        assert_eq!(GuardMode::from_str("BLOCK").unwrap(), GuardMode::Block);
        assert_eq!(GuardMode::from_str("Warn").unwrap(), GuardMode::Warn);
        assert!(GuardMode::from_str("bogus").is_err());
    }

    #[test]
    fn mode_serialization_round_trips() {
        let json = serde_json::to_string(&GuardMode::Warn).unwrap();
        assert_eq!(json, r#""warn""#);
        let parsed: GuardMode = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, GuardMode::Warn);
    }

    #[test]
    fn timeout_cap_boundary() {
        let mut config = GuardConfig::default();
        config.default_timeout_cap_ms = 300_000;
        assert!(config.validate().is_ok());

        config.default_timeout_cap_ms = 300_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_toml_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("browser-guard.toml");
        std::fs::write(
            &path,
            "enabled = true\nmode = \"warn\"\ndefault_max_depth_cap = 4\ndefault_timeout_cap_ms = 45000\n",
        )
        .unwrap();

        let config = GuardConfigBuilder::new().with_file(&path).unwrap().build().unwrap();
        assert_eq!(config.mode, GuardMode::Warn);
        assert_eq!(config.default_max_depth_cap, 4);
        assert_eq!(config.default_timeout_cap_ms, 45_000);
    }

    #[test]
    fn loads_yaml_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("browser-guard.yaml");
        std::fs::write(&path, "enabled: false\nmode: block\n").unwrap();

        let config = GuardConfigBuilder::new().with_file(&path).unwrap().build().unwrap();
        assert!(!config.enabled);
        assert_eq!(config.mode, GuardMode::Block);
    }

    #[test]
    fn rejects_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("browser-guard.ini");
        std::fs::write(&path, "enabled=true").unwrap();

        let err = GuardConfigBuilder::new().with_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }
}
