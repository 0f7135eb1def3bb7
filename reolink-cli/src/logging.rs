//! Logging setup for the `reolink` binary
//!
//! Logs always go to stderr so that stdout carries only command output
//! (JSON in `--json` mode).

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Environment variable that overrides the log filter
pub const LOG_LEVEL_ENV: &str = "REOLINK_LOG_LEVEL";

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber at all
    Silent,
    /// Compact warnings and errors
    Development,
    /// Verbose diagnostics with source locations
    Debug,
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },
}

/// Install the global subscriber for `mode`
///
/// # Environment Variables
///
/// - `REOLINK_LOG_LEVEL`: filter directive (`debug`, `reolink_api=trace`, ...)
/// - `RUST_LOG`: used when `REOLINK_LOG_LEVEL` is unset
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = create_env_filter("warn")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .compact(),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let filter = create_env_filter("debug")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .pretty()
                        .with_thread_names(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// `REOLINK_LOG_LEVEL`, then `RUST_LOG`, then `default_level`
fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let directive = std::env::var(LOG_LEVEL_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level.to_string());

    parse_filter(&directive)
}

fn parse_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|e| LoggingError::InvalidFilter {
        filter: directive.to_string(),
        reason: e.to_string(),
    })
}
