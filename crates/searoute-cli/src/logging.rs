//! Logging setup for the `searoute` binary.
//!
//! # Environment Variables
//!
//! - `LOG_FORMAT`: `text` (default) or `json`
//! - `RUST_LOG`: level filter (default: `info`)
//!
//! Everything is written to stderr so command output on stdout stays
//! machine-readable.

use std::io;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Accepts `json`; anything else means text.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var("LOG_FORMAT").ok().as_deref(),
            std::env::var("RUST_LOG").ok().as_deref(),
        )
    }

    fn from_values(format: Option<&str>, level: Option<&str>) -> Self {
        let defaults = Self::default();
        Self {
            format: format.map(LogFormat::parse).unwrap_or(defaults.format),
            level: level
                .filter(|value| !value.trim().is_empty())
                .map(str::to_string)
                .unwrap_or(defaults.level),
        }
    }
}

/// Install the global subscriber. Calling it twice keeps the first one.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let _ = match config.format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(io::stderr),
            )
            .try_init(),
    };
}
