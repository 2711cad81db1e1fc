// Tracing subscriber initialisation
use crate::config::{LogFormat, LoggerConfig};
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialised(String),
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.default_directives` when it is set.
///
/// # Errors
///
/// Returns [`LoggerError::InvalidFilter`] if the default directives do not parse
/// and [`LoggerError::AlreadyInitialised`] if a global subscriber exists.
pub fn init(config: &LoggerConfig) -> Result<(), LoggerError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.default_directives)
            .map_err(|e| LoggerError::InvalidFilter(e.to_string()))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(config.ansi),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init(),
    };

    result.map_err(|e| LoggerError::AlreadyInitialised(e.to_string()))
}
