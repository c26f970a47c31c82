//! Configuration management
//!
//! Routine defaults and logging settings can be loaded from a TOML or JSON
//! file. Every section is optional; missing values fall back to the built-in
//! defaults.
//!
//! ```toml
//! [gauss_kronrod]
//! points = 61
//! tolerance = 1e-10
//!
//! [trapezoidal]
//! max_levels = 16
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

use crate::error::{Error, Result};
use crate::quadrature::{GaussKronrodOptions, Options};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "KUMQUAT_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Options for `gauss_kronrod`
    pub gauss_kronrod: GaussKronrodOptions,

    /// Options for `tanh_sinh`
    pub tanh_sinh: Options,

    /// Options for `sinh_sinh`
    pub sinh_sinh: Options,

    /// Options for `exp_sinh`
    pub exp_sinh: Options,

    /// Options for `trapezoidal`
    pub trapezoidal: Options,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error, or an `EnvFilter` directive)
    pub level: String,

    /// Output format
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact single-line output
    #[default]
    Compact,
    /// Full format with span context
    Full,
    /// JSON structured output
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gauss_kronrod: GaussKronrodOptions::default(),
            tanh_sinh: Options::default(),
            sinh_sinh: Options::default(),
            exp_sinh: Options::default(),
            trapezoidal: Options::trapezoidal(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "full" => Ok(Self::Full),
            "json" => Ok(Self::Json),
            _ => Err(Error::validation(
                "logging.format",
                format!("expected compact, full or json, got {:?}", s),
            )),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Compact => "compact",
            Self::Full => "full",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

impl Config {
    /// Load configuration from a file; `.toml` files are read as TOML,
    /// anything else as JSON
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };

        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load the file named by `KUMQUAT_CONFIG`, or the defaults if it is unset
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    fn config_path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.gauss_kronrod.validate()?;
        for (name, options) in [
            ("tanh_sinh", &self.tanh_sinh),
            ("sinh_sinh", &self.sinh_sinh),
            ("exp_sinh", &self.exp_sinh),
            ("trapezoidal", &self.trapezoidal),
        ] {
            options.validate().map_err(|err| match err {
                Error::Validation { field, message } => {
                    Error::validation(format!("{}.{}", name, field), message)
                }
                other => other,
            })?;
        }
        if self.logging.level.trim().is_empty() {
            return Err(Error::validation("logging.level", "must not be empty"));
        }
        Ok(())
    }

    /// Save configuration to a file, in the format its extension names
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::to_string_pretty(self)
                .map_err(|err| Error::configuration(format!("cannot serialize to TOML: {}", err)))?
        } else {
            serde_json::to_string_pretty(self)?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}
