//! Configuration management for hydroverify
//!
//! This module provides configuration file support with TOML format,
//! environment variable overrides, and sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Log levels accepted by [`LoggingConfig::log_level`]
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Metric-output aggregation
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Logging and observability
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Aggregation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregationConfig {
    /// Maximum number of submitted cell computations running at once, per output group
    #[serde(default = "default_max_concurrent_cells")]
    pub max_concurrent_cells: usize,

    /// Record Prometheus metrics for registration and resolution
    #[serde(default = "default_true")]
    pub collect_metrics: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable structured logging
    #[serde(default = "default_true")]
    pub structured_logging: bool,
}

// Default value functions
fn default_max_concurrent_cells() -> usize { num_cpus::get() }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_cells: default_max_concurrent_cells(),
            collect_metrics: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            structured_logging: true,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        // Aggregation
        if let Ok(cells) = std::env::var("HYDROVERIFY_MAX_CONCURRENT_CELLS") {
            if let Ok(c) = cells.parse() {
                self.aggregation.max_concurrent_cells = c;
            }
        }
        if let Ok(collect) = std::env::var("HYDROVERIFY_COLLECT_METRICS") {
            if let Ok(c) = collect.parse() {
                self.aggregation.collect_metrics = c;
            }
        }

        // Logging
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.logging.log_level = log_level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.aggregation.max_concurrent_cells == 0 {
            return Err(Error::Configuration(
                "Max concurrent cells must be > 0".to_string(),
            ));
        }

        // RUST_LOG may carry a full filter directive, only plain levels are checked
        let level = self.logging.log_level.to_ascii_lowercase();
        if !level.contains('=') && !level.contains(',') && !LOG_LEVELS.contains(&level.as_str())
        {
            return Err(Error::Configuration(format!(
                "Unknown log level: {}",
                self.logging.log_level
            )));
        }

        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }
}
