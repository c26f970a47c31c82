//! Logging setup for the extension module
//!
//! The core library only emits `tracing` events; this module installs the
//! global subscriber. It is installed at most once per process, either at
//! import time when `KUMQUAT_LOG` is set or on the first successful call to
//! `kumquat.enable_logging`.

use kumquat_core::{Error, LogFormat, LoggingConfig};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive
pub const LOG_ENV: &str = "KUMQUAT_LOG";

/// Environment variable selecting the output format
pub const LOG_FORMAT_ENV: &str = "KUMQUAT_LOG_FORMAT";

static INSTALLED: OnceLock<LoggingConfig> = OnceLock::new();

/// Apply the `KUMQUAT_LOG` and `KUMQUAT_LOG_FORMAT` overrides
pub fn merge_with_env(config: &mut LoggingConfig) {
    if let Ok(level) = std::env::var(LOG_ENV) {
        config.level = level;
    }

    if let Ok(format) = std::env::var(LOG_FORMAT_ENV) {
        match format.parse() {
            Ok(format) => config.format = format,
            Err(_) => tracing::warn!("Invalid log format: {}, using {}", format, config.format),
        }
    }
}

/// Whether logging was requested through the environment
pub fn requested_by_env() -> bool {
    std::env::var_os(LOG_ENV).is_some()
}

/// Install the global subscriber
///
/// Returns `Ok(false)` when a subscriber was already installed by an
/// earlier call; the first configuration stays in effect.
pub fn init_logging(config: LoggingConfig) -> Result<bool, Error> {
    if INSTALLED.get().is_some() {
        return Ok(false);
    }

    let env_filter = EnvFilter::try_new(&config.level).map_err(|e| {
        Error::validation("logging.level", format!("invalid filter directive: {}", e))
    })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Compact => {
            tracing::subscriber::set_global_default(builder.compact().finish())
        }
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.with_ansi(false).json().finish())
        }
        LogFormat::Full => tracing::subscriber::set_global_default(builder.finish()),
    };

    // Another library in the process may own the global default already
    if let Err(e) = installed {
        return Err(Error::configuration(format!(
            "Failed to initialize logging: {}",
            e
        )));
    }

    tracing::debug!(config = ?config, "Logging system initialized");
    let _ = INSTALLED.set(config);
    Ok(true)
}
