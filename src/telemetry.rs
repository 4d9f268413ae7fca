//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Build the filter used by [`init_tracing`]
///
/// `RUST_LOG` wins over the configured level when it is set and parses.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            Error::Configuration(format!("Invalid log filter {}: {}", config.log_level, e))
        }),
    }
}

/// Install a global fmt subscriber
///
/// Fails when the filter is invalid or a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.structured_logging)
        .with_thread_ids(config.structured_logging)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| Error::Configuration(format!("Failed to install tracing subscriber: {}", e)))?;

    tracing::info!(
        level = %config.log_level,
        "hydroverify v{} tracing initialized",
        env!("CARGO_PKG_VERSION")
    );
    Ok(())
}
