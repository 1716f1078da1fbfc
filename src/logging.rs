//! # Logging
//!
//! Installs the global `tracing` subscriber: console output always, plus a
//! daily rolling file when `logging.log_dir` is set.
//!
//! `RUST_LOG` overrides the configured level.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Result, RoverError};

/// File name prefix for rolling log files
pub const LOG_FILE_PREFIX: &str = "elrs-rover.log";

/// Install the global subscriber
///
/// Returns the file writer guard when file logging is enabled; keep it
/// alive until exit so buffered lines are flushed.
///
/// # Errors
///
/// Returns error if a global subscriber is already installed
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let console = fmt::layer().with_target(true);

    if config.log_dir.is_empty() {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .try_init()
            .map_err(|e| RoverError::Logging(e.to_string()))?;
        return Ok(None);
    }

    let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()
        .map_err(|e| RoverError::Logging(e.to_string()))?;

    Ok(Some(guard))
}
