//! Logging setup.
//!
//! Structured logging via `tracing`. The embedding application usually owns
//! the global subscriber; this helper exists for binaries and tests that use
//! the cache standalone. The `EVCACHE_LOG` environment variable overrides the
//! configured level with a full `EnvFilter` directive.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Enable colored output (text format only)
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            color: default_true(),
        }
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(directive) = std::env::var("EVCACHE_LOG") {
        if !directive.is_empty() {
            return Ok(EnvFilter::new(directive));
        }
    }
    match config.level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => {
            Ok(EnvFilter::new(format!("evcache={}", config.level)))
        }
        other => bail!(
            "Invalid log level: {} (must be 'trace', 'debug', 'info', 'warn', 'error', or 'off')",
            other
        ),
    }
}

/// Install a global subscriber for this process.
///
/// Errors if the level or format is invalid or a subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }
    let filter = build_filter(config)?;
    match config.format.as_str() {
        "json" => {
            Registry::default()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        "text" => {
            Registry::default()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_ansi(config.color)
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
        other => bail!("Invalid log format: {} (must be 'json' or 'text')", other),
    }
    Ok(())
}
