//! Hydroverify - Time-series pairing model and metric-output aggregation for forecast verification
//!
//! This library provides the data core of a forecast verification pipeline:
//! - Time-series of paired observations and predictions, organised by forecast issuance
//! - Regular time-series with a fixed lead-time step, and ensemble trace decomposition
//! - Immutable `(time window, threshold)`-keyed stores of metric outputs
//! - A concurrent per-project aggregator that resolves outputs per shape

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod metadata;
pub mod threshold;
pub mod time;
pub mod types;

/// Time-series of events grouped by basis time
pub mod series;

/// Metric outputs and their keyed stores
pub mod output;

/// Concurrent per-project aggregation of metric outputs
pub mod aggregation;

/// Prometheus metrics
pub mod metrics;

/// Configuration management with TOML support
pub mod config;

/// Tracing subscriber setup
pub mod telemetry;

// Re-export main types
pub use aggregation::{ProjectOutput, ProjectOutputBuilder};
pub use config::Config;
pub use error::{Error, Result};
pub use series::{RegularTimeSeries, RegularTimeSeriesBuilder, TimeSeries, TimeSeriesBuilder};
pub use types::{EnsemblePair, Event, SingleValuedPair, Timestamp};
