//! Core value types used throughout the verification core
//!
//! # Key Types
//!
//! - **`Event<T>`**: A single time-indexed value (valid time + value)
//! - **`SingleValuedPair`**: An observed value paired with one predicted value
//! - **`EnsemblePair`**: An observed value paired with a fixed set of ensemble members
//! - **`Climatology`**: Sorted reference data used as a skill-score baseline
//!
//! # Example
//!
//! ```rust
//! use hydroverify::types::{EnsemblePair, Event, SingleValuedPair, Timestamp};
//! use chrono::{TimeZone, Utc};
//!
//! let time: Timestamp = Utc.with_ymd_and_hms(1985, 1, 1, 6, 0, 0).unwrap();
//! let event = Event::new(time, SingleValuedPair::new(1.0, 1.5));
//! assert_eq!(event.value().right(), 1.5);
//!
//! let ensemble = EnsemblePair::new(3.0, vec![2.5, 3.1, 3.4]).unwrap();
//! assert_eq!(ensemble.width(), 3);
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// UTC instant used for basis times and valid times
pub type Timestamp = DateTime<Utc>;

/// A single time-indexed value
///
/// Events are immutable once created. Within an atomic series they are always
/// presented in strictly ascending valid-time order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event<T> {
    time: Timestamp,
    value: T,
}

impl<T> Event<T> {
    /// Create a new event
    pub fn new(time: Timestamp, value: T) -> Self {
        Self { time, value }
    }

    /// Valid time of the event
    pub fn time(&self) -> Timestamp {
        self.time
    }

    /// Value of the event
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consume the event, returning its value
    pub fn into_value(self) -> T {
        self.value
    }

    /// Build a new event at the same time with a transformed value
    pub fn map<U>(&self, f: impl FnOnce(&T) -> U) -> Event<U> {
        Event::new(self.time, f(&self.value))
    }
}

impl<T: fmt::Display> fmt::Display for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.time.to_rfc3339(), self.value)
    }
}

/// Verification pair of two single-valued, continuous variables
///
/// By convention the left value is the observation and the right value the
/// prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SingleValuedPair {
    left: f64,
    right: f64,
}

impl SingleValuedPair {
    /// Create a new pair
    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    /// Left (observed) value
    pub fn left(&self) -> f64 {
        self.left
    }

    /// Right (predicted) value
    pub fn right(&self) -> f64 {
        self.right
    }
}

impl fmt::Display for SingleValuedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.left, self.right)
    }
}

/// Verification pair whose right side is an ensemble of predictions
///
/// Members are stored behind an `Arc<[f64]>`, so clones share the same buffer and
/// callers can only ever observe them through a read-only slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsemblePair {
    left: f64,
    members: Arc<[f64]>,
}

impl EnsemblePair {
    /// Create a new ensemble pair
    ///
    /// # Errors
    ///
    /// Returns `DataError::EmptyEnsemble` when no members are supplied.
    pub fn new(left: f64, members: impl Into<Arc<[f64]>>) -> Result<Self, DataError> {
        let members = members.into();
        if members.is_empty() {
            return Err(DataError::EmptyEnsemble);
        }
        Ok(Self { left, members })
    }

    /// Left (observed) value
    pub fn left(&self) -> f64 {
        self.left
    }

    /// Ensemble members
    pub fn members(&self) -> &[f64] {
        &self.members
    }

    /// Number of ensemble members
    pub fn width(&self) -> usize {
        self.members.len()
    }

    /// Single-valued pair built from the member at `index`
    pub fn trace(&self, index: usize) -> Option<SingleValuedPair> {
        self.members
            .get(index)
            .map(|&member| SingleValuedPair::new(self.left, member))
    }

    /// Ensemble pair retaining the members whose index matches the predicate
    ///
    /// Returns `None` when no member is retained.
    pub fn select_members(&self, keep: impl Fn(usize) -> bool) -> Option<EnsemblePair> {
        let retained: Vec<f64> = self
            .members
            .iter()
            .enumerate()
            .filter(|(i, _)| keep(*i))
            .map(|(_, &m)| m)
            .collect();

        if retained.is_empty() {
            None
        } else {
            Some(Self {
                left: self.left,
                members: retained.into(),
            })
        }
    }
}

impl fmt::Display for EnsemblePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.left)?;
        for member in self.members.iter() {
            write!(f, ",{}", member)?;
        }
        Ok(())
    }
}

/// Values that can be stored in a time-series
///
/// The only structural property the series layer needs is the ensemble width, which
/// must be constant within an atomic series.
pub trait Sample: Clone + Send + Sync + 'static {
    /// Number of ensemble members, or `None` for single-valued data
    fn member_count(&self) -> Option<usize> {
        None
    }
}

impl Sample for f64 {}

impl Sample for SingleValuedPair {}

impl Sample for EnsemblePair {
    fn member_count(&self) -> Option<usize> {
        Some(self.width())
    }
}

/// Climatological reference data for one feature
///
/// Stored sorted ascending. Non-finite values (e.g. missing-value sentinels mapped to
/// NaN) are allowed but at least one value must be finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Climatology {
    values: Arc<[f64]>,
}

impl Climatology {
    /// Create climatology from unsorted values
    ///
    /// # Errors
    ///
    /// Returns `DataError::InvalidClimatology` if the input is empty or contains no
    /// finite value.
    pub fn new(mut values: Vec<f64>) -> Result<Self, DataError> {
        if values.is_empty() {
            return Err(DataError::InvalidClimatology(
                "cannot build climatology from empty data".to_string(),
            ));
        }
        if !values.iter().any(|v| v.is_finite()) {
            return Err(DataError::InvalidClimatology(
                "climatology must contain at least one finite value".to_string(),
            ));
        }

        values.sort_by(f64::total_cmp);
        Ok(Self {
            values: values.into(),
        })
    }

    /// Sorted climatological values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a validated climatology
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Finite values only, still sorted
    pub fn finite_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied().filter(|v| v.is_finite())
    }
}
