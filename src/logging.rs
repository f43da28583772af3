//! Structured JSON logging.
//!
//! One record per line on stderr, so stdout stays free for the response the
//! CLI prints. Records emitted inside an invocation carry its span fields
//! (`request_id`, `service`, `timestamp`).

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid log level filter {level:?}: {source}")]
    Filter {
        level: String,
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to install log subscriber: {0}")]
    Init(String),
}

/// Parse a filter directive such as `"info"` or `"image_derivatives=debug,warn"`.
pub fn filter(level: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(level).map_err(|source| LoggingError::Filter {
        level: level.to_string(),
        source,
    })
}

/// Install the global subscriber. Call once, from the binary.
pub fn init(level: &str) -> Result<(), LoggingError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(level)?)
        .with_target(false)
        .with_writer(std::io::stderr)
        .json()
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}
