//! Regular time-series with a fixed time step

use std::iter::FusedIterator;
use std::ops::Deref;

use chrono::Duration;
use tracing::debug;

use super::iter::gather_at;
use super::{AtomicSeries, BasisTimeIter, TimeSeries, TimeSeriesBuilder};
use crate::error::{DataError, Result};
use crate::metadata::SampleMetadata;
use crate::types::{Climatology, Event, Sample, Timestamp};

/// A time-series whose atomic series all hold events at leads `step, 2 x step, ..`
///
/// Dereferences to the underlying [`TimeSeries`] for every read-only accessor.
/// The basis-time and duration views yield regular sub-series.
#[derive(Debug)]
pub struct RegularTimeSeries<T> {
    series: TimeSeries<T>,
    step: Duration,
}

impl<T> Clone for RegularTimeSeries<T> {
    fn clone(&self) -> Self {
        Self {
            series: self.series.clone(),
            step: self.step,
        }
    }
}

impl<T: PartialEq> PartialEq for RegularTimeSeries<T> {
    fn eq(&self, other: &Self) -> bool {
        self.step == other.step && self.series == other.series
    }
}

impl<T> Deref for RegularTimeSeries<T> {
    type Target = TimeSeries<T>;

    fn deref(&self) -> &Self::Target {
        &self.series
    }
}

/// Check event counts and lead durations of every atomic series against the step
///
/// Every atomic series must hold `expected_count` events when given, otherwise as many
/// as the first one. Returns the shared count, `None` without atomic series.
fn validate_steps<'a, T: 'a>(
    kind: &'static str,
    atomics: impl Iterator<Item = AtomicSeries<'a, T>>,
    step: Duration,
    mut expected_count: Option<usize>,
) -> std::result::Result<Option<usize>, DataError> {
    let mut seen = false;
    for atomic in atomics {
        seen = true;
        let basis_time = atomic.basis_time();
        let expected = *expected_count.get_or_insert(atomic.len());
        if atomic.len() != expected {
            return Err(DataError::StepCountMismatch {
                kind,
                basis_time,
                expected,
                actual: atomic.len(),
            });
        }

        for (multiple, actual) in (1..).zip(atomic.durations()) {
            let expected = step * multiple;
            if actual != expected {
                return Err(DataError::OffStep {
                    basis_time,
                    step,
                    expected,
                    actual,
                });
            }
        }
    }
    Ok(expected_count.filter(|_| seen))
}

impl<T> RegularTimeSeries<T> {
    /// Wrap an irregular series, validating it against the step
    ///
    /// # Errors
    ///
    /// Fails with invalid input when the step is not positive, when atomic series of the
    /// main series or the baseline have different event counts, or when the
    /// leads of an atomic series are not exactly `step x 1 .. step x n`.
    pub fn from_series(series: TimeSeries<T>, step: Duration) -> Result<Self> {
        if step <= Duration::zero() {
            return Err(DataError::InvalidTimeStep(Some(step)).into());
        }
        let count = validate_steps("main", series.atomic_series(), step, None)?;
        validate_steps("baseline", series.baseline(), step, count)?;
        Ok(Self { series, step })
    }

    /// The fixed time step
    pub fn time_step(&self) -> Duration {
        self.step
    }

    /// Underlying series
    pub fn as_series(&self) -> &TimeSeries<T> {
        &self.series
    }

    /// Consume into the underlying series
    pub fn into_series(self) -> TimeSeries<T> {
        self.series
    }

    pub(crate) fn from_parts_unchecked(series: TimeSeries<T>, step: Duration) -> Self {
        Self { series, step }
    }

    /// One regular sub-series per basis time, with the same step
    pub fn basis_time_iter(&self) -> RegularBasisTimeIter<'_, T> {
        RegularBasisTimeIter {
            inner: self.series.basis_time_iter(),
            step: self.step,
        }
    }

    /// One regular sub-series per lead duration, each with the duration as its step
    pub fn duration_iter(&self) -> RegularDurationIter<'_, T>
    where
        T: Clone,
    {
        RegularDurationIter {
            series: &self.series,
            next: 0,
        }
    }

    /// Atomic series whose basis time matches the predicate
    ///
    /// The baseline is filtered with the same predicate. Returns `None` when nothing
    /// in the main series matches and a series equal to this one when every main and
    /// baseline atomic series matches.
    pub fn filter_by_basis_time(&self, keep: impl Fn(Timestamp) -> bool) -> Option<Self>
    where
        T: Clone,
    {
        let everything = self
            .series
            .atomic_series()
            .chain(self.series.baseline())
            .all(|a| keep(a.basis_time()));
        if everything {
            return Some(self.clone());
        }
        let series = self.series.filter_by_basis_time(keep)?;
        Some(Self::from_parts_unchecked(series, self.step))
    }

    /// Lead durations matching the predicate
    ///
    /// The retained leads must be `s, 2s, .., ks` for `s` the first retained lead, and
    /// the result has step `s`. Returns `Ok(None)` when no lead matches.
    ///
    /// # Errors
    ///
    /// `DataError::IrregularFilter` when the retained leads are not evenly spaced from
    /// the first one.
    pub fn filter_by_duration(&self, keep: impl Fn(Duration) -> bool) -> Result<Option<Self>>
    where
        T: Clone,
    {
        let retained: Vec<Duration> = self
            .series
            .durations()
            .iter()
            .copied()
            .filter(|&d| keep(d))
            .collect();

        let Some(&step) = retained.first() else {
            return Ok(None);
        };

        for (multiple, &actual) in (1..).zip(&retained) {
            if actual != step * multiple {
                return Err(DataError::IrregularFilter(format!(
                    "retained lead {} is not {} times the first retained lead {}",
                    actual, multiple, step
                ))
                .into());
            }
        }

        let Some(series) = self
            .series
            .filter_by_duration(|d| retained.binary_search(&d).is_ok())
        else {
            return Ok(None);
        };
        Ok(Some(Self::from_parts_unchecked(series, step)))
    }
}

/// Per-issuance view of a [`RegularTimeSeries`]
#[derive(Debug)]
pub struct RegularBasisTimeIter<'a, T> {
    inner: BasisTimeIter<'a, T>,
    step: Duration,
}

impl<T> Clone for RegularBasisTimeIter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            step: self.step,
        }
    }
}

impl<T> Iterator for RegularBasisTimeIter<'_, T> {
    type Item = RegularTimeSeries<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let step = self.step;
        self.inner
            .next()
            .map(|series| RegularTimeSeries::from_parts_unchecked(series, step))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for RegularBasisTimeIter<'_, T> {}

impl<T> FusedIterator for RegularBasisTimeIter<'_, T> {}

/// Per-lead-duration view of a [`RegularTimeSeries`]
#[derive(Debug)]
pub struct RegularDurationIter<'a, T> {
    series: &'a TimeSeries<T>,
    next: usize,
}

impl<T> Clone for RegularDurationIter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            series: self.series,
            next: self.next,
        }
    }
}

impl<T: Clone> Iterator for RegularDurationIter<'_, T> {
    type Item = RegularTimeSeries<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let lead = *self.series.durations().get(self.next)?;
        self.next += 1;

        let main = gather_at(self.series.main_arena(), lead)?;
        let baseline = self
            .series
            .baseline_arena()
            .and_then(|b| gather_at(b, lead));
        Some(RegularTimeSeries::from_parts_unchecked(
            self.series.with_storage(main, baseline),
            lead,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.series.durations().len() - self.next;
        (remaining, Some(remaining))
    }
}

impl<T: Clone> ExactSizeIterator for RegularDurationIter<'_, T> {}

impl<T: Clone> FusedIterator for RegularDurationIter<'_, T> {}

/// Builder for [`RegularTimeSeries`]
#[derive(Debug)]
pub struct RegularTimeSeriesBuilder<T> {
    inner: TimeSeriesBuilder<T>,
    step: Option<Duration>,
}

impl<T> Default for RegularTimeSeriesBuilder<T> {
    fn default() -> Self {
        Self {
            inner: TimeSeriesBuilder::default(),
            step: None,
        }
    }
}

impl<T: Sample> RegularTimeSeriesBuilder<T> {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time step
    pub fn with_time_step(mut self, step: Duration) -> Self {
        self.step = Some(step);
        self
    }

    /// Add an atomic series
    pub fn add_series(mut self, basis_time: Timestamp, events: impl IntoIterator<Item = Event<T>>) -> Self {
        self.inner = self.inner.add_series(basis_time, events);
        self
    }

    /// Add a baseline atomic series
    pub fn add_baseline_series(
        mut self,
        basis_time: Timestamp,
        events: impl IntoIterator<Item = Event<T>>,
    ) -> Self {
        self.inner = self.inner.add_baseline_series(basis_time, events);
        self
    }

    /// Set the main metadata
    pub fn with_metadata(mut self, metadata: SampleMetadata) -> Self {
        self.inner = self.inner.with_metadata(metadata);
        self
    }

    /// Set the baseline metadata
    pub fn with_baseline_metadata(mut self, metadata: SampleMetadata) -> Self {
        self.inner = self.inner.with_baseline_metadata(metadata);
        self
    }

    /// Set the climatology; the first one supplied is kept
    pub fn with_climatology(mut self, climatology: Climatology) -> Self {
        self.inner = self.inner.with_climatology(climatology);
        self
    }

    /// Add every atomic series of another regular series
    ///
    /// Metadata is unioned at build; the baseline is merged independently.
    ///
    /// # Errors
    ///
    /// `DataError::TimeStepMismatch` when the builder already has a different step.
    pub fn merge(mut self, series: &RegularTimeSeries<T>) -> Result<Self> {
        match self.step {
            Some(expected) if expected != series.time_step() => {
                return Err(DataError::TimeStepMismatch {
                    expected,
                    actual: series.time_step(),
                }
                .into());
            },
            _ => self.step = Some(series.time_step()),
        }
        self.inner = self.inner.merge(series.as_series());
        Ok(self)
    }

    /// Validate and freeze the series
    ///
    /// # Errors
    ///
    /// Everything [`TimeSeriesBuilder::build`] rejects, a missing or non-positive
    /// step, and the step checks of [`RegularTimeSeries::from_series`].
    pub fn build(self) -> Result<RegularTimeSeries<T>> {
        let step = self
            .step
            .filter(|s| *s > Duration::zero())
            .ok_or(DataError::InvalidTimeStep(self.step))?;

        let series = RegularTimeSeries::from_series(self.inner.build_series()?, step)?;
        crate::metrics::record_series_built("regular");
        debug!(
            series = series.series_count(),
            events = series.event_count(),
            step = %step,
            "Built regular time-series"
        );
        Ok(series)
    }
}
