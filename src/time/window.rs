use std::fmt;

use chrono::Duration;

use super::{lead_duration, UNBOUNDED_EARLIEST, UNBOUNDED_LATEST};
use crate::error::DataError;
use crate::types::Timestamp;

/// Bounds on reference (basis) times, valid times and lead durations
///
/// Ordering is lexicographic over the bounds in declaration order: earliest then
/// latest reference time, earliest then latest valid time, earliest then latest lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeWindow {
    earliest_reference_time: Timestamp,
    latest_reference_time: Timestamp,
    earliest_valid_time: Timestamp,
    latest_valid_time: Timestamp,
    earliest_lead: Duration,
    latest_lead: Duration,
}

impl TimeWindow {
    /// Start a builder with unbounded times and zero lead bounds
    pub fn builder() -> TimeWindowBuilder {
        TimeWindowBuilder::default()
    }

    /// Window bounded by lead durations only
    pub fn of_leads(earliest_lead: Duration, latest_lead: Duration) -> Result<Self, DataError> {
        Self::builder()
            .earliest_lead(earliest_lead)
            .latest_lead(latest_lead)
            .build()
    }

    /// Window bounded by reference times only, with a zero lead
    pub fn of_reference_times(
        earliest_reference_time: Timestamp,
        latest_reference_time: Timestamp,
    ) -> Result<Self, DataError> {
        Self::builder()
            .earliest_reference_time(earliest_reference_time)
            .latest_reference_time(latest_reference_time)
            .build()
    }

    /// Window bounded by reference times and lead durations
    pub fn of_reference_times_and_leads(
        earliest_reference_time: Timestamp,
        latest_reference_time: Timestamp,
        earliest_lead: Duration,
        latest_lead: Duration,
    ) -> Result<Self, DataError> {
        Self::builder()
            .earliest_reference_time(earliest_reference_time)
            .latest_reference_time(latest_reference_time)
            .earliest_lead(earliest_lead)
            .latest_lead(latest_lead)
            .build()
    }

    /// Smallest window that covers every input window
    ///
    /// # Errors
    ///
    /// Returns `DataError::Empty` when no window is supplied.
    pub fn union_of<'a>(windows: impl IntoIterator<Item = &'a TimeWindow>) -> Result<Self, DataError> {
        let mut windows = windows.into_iter();
        let first = *windows
            .next()
            .ok_or_else(|| DataError::Empty("cannot union an empty set of time windows".to_string()))?;

        Ok(windows.fold(first, |acc, next| TimeWindow {
            earliest_reference_time: acc.earliest_reference_time.min(next.earliest_reference_time),
            latest_reference_time: acc.latest_reference_time.max(next.latest_reference_time),
            earliest_valid_time: acc.earliest_valid_time.min(next.earliest_valid_time),
            latest_valid_time: acc.latest_valid_time.max(next.latest_valid_time),
            earliest_lead: acc.earliest_lead.min(next.earliest_lead),
            latest_lead: acc.latest_lead.max(next.latest_lead),
        }))
    }

    /// Earliest reference time
    pub fn earliest_reference_time(&self) -> Timestamp {
        self.earliest_reference_time
    }

    /// Latest reference time
    pub fn latest_reference_time(&self) -> Timestamp {
        self.latest_reference_time
    }

    /// Earliest valid time
    pub fn earliest_valid_time(&self) -> Timestamp {
        self.earliest_valid_time
    }

    /// Latest valid time
    pub fn latest_valid_time(&self) -> Timestamp {
        self.latest_valid_time
    }

    /// Earliest lead duration
    pub fn earliest_lead(&self) -> Duration {
        self.earliest_lead
    }

    /// Latest lead duration
    pub fn latest_lead(&self) -> Duration {
        self.latest_lead
    }

    /// Window with the same lead bounds and unbounded times
    pub fn lead_bounds(&self) -> TimeWindow {
        TimeWindow {
            earliest_reference_time: UNBOUNDED_EARLIEST,
            latest_reference_time: UNBOUNDED_LATEST,
            earliest_valid_time: UNBOUNDED_EARLIEST,
            latest_valid_time: UNBOUNDED_LATEST,
            ..*self
        }
    }

    /// Whether the lead bounds of both windows are equal
    pub fn same_leads(&self, other: &TimeWindow) -> bool {
        self.earliest_lead == other.earliest_lead && self.latest_lead == other.latest_lead
    }

    /// Inclusive lead-duration containment
    pub fn contains_lead(&self, lead: Duration) -> bool {
        self.earliest_lead <= lead && lead <= self.latest_lead
    }

    /// Whether an event issued at `basis_time` and valid at `valid_time` falls inside
    /// every bound of the window
    pub fn contains(&self, basis_time: Timestamp, valid_time: Timestamp) -> bool {
        self.earliest_reference_time <= basis_time
            && basis_time <= self.latest_reference_time
            && self.earliest_valid_time <= valid_time
            && valid_time <= self.latest_valid_time
            && self.contains_lead(lead_duration(basis_time, valid_time))
    }

    /// Either reference time bound is open
    pub fn has_unbounded_reference_times(&self) -> bool {
        self.earliest_reference_time == UNBOUNDED_EARLIEST
            || self.latest_reference_time == UNBOUNDED_LATEST
    }

    /// Either valid time bound is open
    pub fn has_unbounded_valid_times(&self) -> bool {
        self.earliest_valid_time == UNBOUNDED_EARLIEST || self.latest_valid_time == UNBOUNDED_LATEST
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{},{},{},{},{}]",
            self.earliest_reference_time.to_rfc3339(),
            self.latest_reference_time.to_rfc3339(),
            self.earliest_valid_time.to_rfc3339(),
            self.latest_valid_time.to_rfc3339(),
            self.earliest_lead,
            self.latest_lead
        )
    }
}

/// Builder for [`TimeWindow`]
#[derive(Debug, Clone, Copy)]
pub struct TimeWindowBuilder {
    window: TimeWindow,
}

impl Default for TimeWindowBuilder {
    fn default() -> Self {
        Self {
            window: TimeWindow {
                earliest_reference_time: UNBOUNDED_EARLIEST,
                latest_reference_time: UNBOUNDED_LATEST,
                earliest_valid_time: UNBOUNDED_EARLIEST,
                latest_valid_time: UNBOUNDED_LATEST,
                earliest_lead: Duration::zero(),
                latest_lead: Duration::zero(),
            },
        }
    }
}

impl TimeWindowBuilder {
    /// Set the earliest reference time
    pub fn earliest_reference_time(mut self, time: Timestamp) -> Self {
        self.window.earliest_reference_time = time;
        self
    }

    /// Set the latest reference time
    pub fn latest_reference_time(mut self, time: Timestamp) -> Self {
        self.window.latest_reference_time = time;
        self
    }

    /// Set the earliest valid time
    pub fn earliest_valid_time(mut self, time: Timestamp) -> Self {
        self.window.earliest_valid_time = time;
        self
    }

    /// Set the latest valid time
    pub fn latest_valid_time(mut self, time: Timestamp) -> Self {
        self.window.latest_valid_time = time;
        self
    }

    /// Set the earliest lead duration
    pub fn earliest_lead(mut self, lead: Duration) -> Self {
        self.window.earliest_lead = lead;
        self
    }

    /// Set the latest lead duration
    pub fn latest_lead(mut self, lead: Duration) -> Self {
        self.window.latest_lead = lead;
        self
    }

    /// Validate and build
    ///
    /// # Errors
    ///
    /// Returns `DataError::InvalidTimeWindow` when any latest bound precedes its
    /// earliest bound.
    pub fn build(self) -> Result<TimeWindow, DataError> {
        let w = self.window;
        if w.latest_reference_time < w.earliest_reference_time {
            return Err(DataError::InvalidTimeWindow(
                "the latest reference time is before the earliest reference time".to_string(),
            ));
        }
        if w.latest_valid_time < w.earliest_valid_time {
            return Err(DataError::InvalidTimeWindow(
                "the latest valid time is before the earliest valid time".to_string(),
            ));
        }
        if w.latest_lead < w.earliest_lead {
            return Err(DataError::InvalidTimeWindow(
                "the latest lead duration is before the earliest lead duration".to_string(),
            ));
        }
        Ok(w)
    }
}
