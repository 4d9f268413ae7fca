//! Error types for the verification core
//!
//! Failures fall into three categories, all raised fail-fast and never retried:
//!
//! - **Invalid input** ([`DataError`]): raised synchronously when a series, store or
//!   value type is constructed from inconsistent data.
//! - **No matching data** ([`Error::NoMatchingData`]): raised by lookups whose contract
//!   requires a result.
//! - **Aggregation access failure** ([`AggregationError`]): raised lazily when a shape
//!   of the project aggregator is resolved and one of its cells failed.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::output::{MetricOutputKey, OutputGroup};

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    /// Structurally invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] DataError),

    /// A lookup found nothing where a result is required
    #[error("No matching data: {0}")]
    NoMatchingData(String),

    /// A shape of the project aggregator could not be resolved
    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid input detected while building a value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    /// Required data is missing
    #[error("Missing required data: {0}")]
    Empty(String),

    /// An atomic series was registered without events
    #[error("Atomic series with basis time {basis_time} has no events")]
    EmptySeries {
        /// Basis time of the offending series
        basis_time: DateTime<Utc>,
    },

    /// Events of an atomic series are not strictly ascending in valid time
    #[error("Events of the atomic series with basis time {basis_time} are not strictly ascending at {valid_time}")]
    UnorderedEvents {
        /// Basis time of the offending series
        basis_time: DateTime<Utc>,
        /// First valid time that breaks the ordering
        valid_time: DateTime<Utc>,
    },

    /// Ensemble pairs of one atomic series have different member counts
    #[error("Ensemble width mismatch in the atomic series with basis time {basis_time}: expected {expected} members, found {actual}")]
    EnsembleWidthMismatch {
        /// Basis time of the offending series
        basis_time: DateTime<Utc>,
        /// Width of the first pair
        expected: usize,
        /// Width of the offending pair
        actual: usize,
    },

    /// An ensemble pair was built without members
    #[error("An ensemble pair requires at least one member")]
    EmptyEnsemble,

    /// Atomic series of a regular time-series have different event counts
    #[error("Inconsistent {kind} event count in a regular time-series: expected {expected}, found {actual} at basis time {basis_time}")]
    StepCountMismatch {
        /// "main" or "baseline"
        kind: &'static str,
        /// Basis time of the offending series
        basis_time: DateTime<Utc>,
        /// Count of the first series
        expected: usize,
        /// Count of the offending series
        actual: usize,
    },

    /// Lead durations of an atomic series do not match the regular step
    #[error("Lead duration {actual} of the atomic series with basis time {basis_time} does not match the expected lead {expected} for a time step of {step}")]
    OffStep {
        /// Basis time of the offending series
        basis_time: DateTime<Utc>,
        /// The regular time step
        step: Duration,
        /// Expected lead duration
        expected: Duration,
        /// Actual lead duration
        actual: Duration,
    },

    /// A regular series was built without a time step, or with a non-positive one
    #[error("A regular time-series requires a positive time step, found {0:?}")]
    InvalidTimeStep(Option<Duration>),

    /// Two regular series with different steps were merged
    #[error("The input time-series has a time step of {actual}, which is inconsistent with the time step of the existing data, {expected}")]
    TimeStepMismatch {
        /// Step of the existing data
        expected: Duration,
        /// Step of the merged series
        actual: Duration,
    },

    /// A filter would produce an irregular series from a regular one
    #[error("The filtered view of durations would produce an irregular time-series: {0}")]
    IrregularFilter(String),

    /// Metadata cannot be combined
    #[error("Metadata mismatch: {0}")]
    MetadataMismatch(String),

    /// Climatological data is unusable
    #[error("Invalid climatology: {0}")]
    InvalidClimatology(String),

    /// Threshold definition is inconsistent
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    /// Time window bounds are inverted
    #[error("Invalid time window: {0}")]
    InvalidTimeWindow(String),
}

/// Failure to resolve one output shape of the project aggregator
///
/// Cloneable so that a cached resolution failure can be handed to every caller
/// that asks for the same shape.
#[derive(Error, Debug, Clone)]
pub enum AggregationError {
    /// A cell computation completed with an error
    #[error("While retrieving the results for group {group} at lead time {} and threshold {}: {reason}", .key.time_window(), .key.threshold())]
    CellFailed {
        /// Output shape being resolved
        group: OutputGroup,
        /// Coordinate of the failed cell
        key: MetricOutputKey,
        /// Error reported by the computation
        reason: String,
    },

    /// A cell computation vanished before producing a result
    #[error("Interrupted while retrieving the results for group {group} at lead time {} and threshold {}: {reason}", .key.time_window(), .key.threshold())]
    Interrupted {
        /// Output shape being resolved
        group: OutputGroup,
        /// Coordinate of the interrupted cell
        key: MetricOutputKey,
        /// What happened to the producer
        reason: String,
    },

    /// Outputs of a cell could not be merged into an immutable store
    #[error("Inconsistent outputs for group {group}: {reason}")]
    Inconsistent {
        /// Output shape being resolved
        group: OutputGroup,
        /// Description of the inconsistency
        reason: String,
    },
}

impl AggregationError {
    /// Output shape the failure belongs to
    pub fn group(&self) -> OutputGroup {
        match self {
            AggregationError::CellFailed { group, .. }
            | AggregationError::Interrupted { group, .. }
            | AggregationError::Inconsistent { group, .. } => *group,
        }
    }

    /// Coordinate of the offending cell, when the failure is tied to one
    pub fn key(&self) -> Option<&MetricOutputKey> {
        match self {
            AggregationError::CellFailed { key, .. } | AggregationError::Interrupted { key, .. } => {
                Some(key)
            },
            AggregationError::Inconsistent { .. } => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
