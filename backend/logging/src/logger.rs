//! Structured Logger
//!
//! Wraps `tracing` to provide plain or JSON console output, optional daily
//! NDJSON file rotation, and environment-based level control.

use blindspot_config::schema::LoggingConfig;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// File name prefix of the rolling log, e.g. `blindspot.log.2026-10-19`.
const LOG_FILE_PREFIX: &str = "blindspot.log";

/// Build the level filter. `RUST_LOG` wins over the configured level.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the global structured logger.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_logger(config: &LoggingConfig) {
    let console_json = config.json.then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(false)
    });
    let console_plain = (!config.json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(true)
    });

    let file_layer = config.dir.as_ref().map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(console_json)
        .with(console_plain)
        .with(file_layer)
        .try_init();
}
