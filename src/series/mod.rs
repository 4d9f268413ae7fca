//! Time-series of verification pairs
//!
//! A [`TimeSeries`] is a collection of atomic series, each a run of events issued at
//! one basis time, plus an optional baseline collection. Storage is a two-level arena:
//! one contiguous event buffer shared behind an `Arc` and a span table of
//! `(basis time, start, len)` entries. Sub-series produced by the basis-time view share
//! both buffers and only narrow the visible span range.
//!
//! # Views
//!
//! - [`TimeSeries::time_iter`]: every event, basis-time-major in registration order
//! - [`TimeSeries::basis_time_iter`]: one sub-series per basis time
//! - [`TimeSeries::duration_iter`]: one sub-series per lead duration, ascending
//!
//! Each call returns a fresh iterator over the same frozen storage.
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use hydroverify::series::TimeSeriesBuilder;
//! use hydroverify::types::{Event, SingleValuedPair};
//!
//! let basis = Utc.with_ymd_and_hms(1985, 1, 1, 0, 0, 0).unwrap();
//! let events = (1..=3)
//!     .map(|h| Event::new(basis + Duration::hours(h), SingleValuedPair::new(1.0, 2.0)))
//!     .collect::<Vec<_>>();
//!
//! let series = TimeSeriesBuilder::new().add_series(basis, events).build().unwrap();
//! assert_eq!(series.time_iter().count(), 3);
//! assert_eq!(series.regular_duration(), Some(Duration::hours(1)));
//! ```

mod ensemble;
mod iter;
mod regular;

pub use ensemble::EnsembleTraceIter;
pub use iter::{BasisTimeIter, DurationIter, TimeIter};
pub use regular::{
    RegularBasisTimeIter, RegularDurationIter, RegularTimeSeries, RegularTimeSeriesBuilder,
};

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;
use std::sync::Arc;

use chrono::Duration;
use tracing::debug;

use crate::error::{DataError, Result};
use crate::metadata::SampleMetadata;
use crate::time::lead_duration;
use crate::types::{Climatology, Event, Sample, Timestamp};

/// Entry of the span table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) basis_time: Timestamp,
    pub(crate) start: usize,
    pub(crate) len: usize,
}

/// Event buffer plus span table, restricted to a range of visible spans
///
/// Spans are laid out contiguously in registration order, so the events of any span
/// range form one contiguous slice.
#[derive(Debug)]
pub(crate) struct Arena<T> {
    events: Arc<[Event<T>]>,
    spans: Arc<[Span]>,
    visible: Range<usize>,
}

impl<T> Clone for Arena<T> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
            spans: Arc::clone(&self.spans),
            visible: self.visible.clone(),
        }
    }
}

impl<T> Arena<T> {
    pub(crate) fn from_groups(groups: impl IntoIterator<Item = (Timestamp, Vec<Event<T>>)>) -> Self {
        let mut events = Vec::new();
        let mut spans = Vec::new();
        for (basis_time, group) in groups {
            spans.push(Span {
                basis_time,
                start: events.len(),
                len: group.len(),
            });
            events.extend(group);
        }
        let visible = 0..spans.len();
        Self {
            events: events.into(),
            spans: spans.into(),
            visible,
        }
    }

    pub(crate) fn spans(&self) -> &[Span] {
        &self.spans[self.visible.clone()]
    }

    pub(crate) fn events(&self) -> &[Event<T>] {
        match (self.spans().first(), self.spans().last()) {
            (Some(first), Some(last)) => &self.events[first.start..last.start + last.len],
            _ => &[],
        }
    }

    pub(crate) fn atomic(&self, index: usize) -> AtomicSeries<'_, T> {
        let span = self.spans()[index];
        AtomicSeries {
            basis_time: span.basis_time,
            events: &self.events[span.start..span.start + span.len],
        }
    }

    pub(crate) fn atomic_iter(&self) -> impl Iterator<Item = AtomicSeries<'_, T>> + '_ {
        (0..self.spans().len()).map(move |i| self.atomic(i))
    }

    /// Arena sharing the same buffers with one visible span
    pub(crate) fn narrow(&self, index: usize) -> Self {
        let start = self.visible.start + index;
        Self {
            events: Arc::clone(&self.events),
            spans: Arc::clone(&self.spans),
            visible: start..start + 1,
        }
    }

    /// Position of every basis time, first registration wins
    pub(crate) fn positions(&self) -> HashMap<Timestamp, usize> {
        let mut positions = HashMap::with_capacity(self.spans().len());
        for (i, span) in self.spans().iter().enumerate() {
            positions.entry(span.basis_time).or_insert(i);
        }
        positions
    }

    /// New arena of the atomic series rebuilt through `f`; empty results are dropped
    pub(crate) fn rebuild<U>(
        &self,
        mut f: impl FnMut(AtomicSeries<'_, T>) -> Vec<Event<U>>,
    ) -> Option<Arena<U>> {
        let groups: Vec<_> = self
            .atomic_iter()
            .map(|atomic| (atomic.basis_time, f(atomic)))
            .filter(|(_, events)| !events.is_empty())
            .collect();

        if groups.is_empty() {
            None
        } else {
            Some(Arena::from_groups(groups))
        }
    }
}

/// Read-only view of one forecast issuance
#[derive(Debug)]
pub struct AtomicSeries<'a, T> {
    basis_time: Timestamp,
    events: &'a [Event<T>],
}

impl<T> Clone for AtomicSeries<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AtomicSeries<'_, T> {}

impl<T: PartialEq> PartialEq for AtomicSeries<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.basis_time == other.basis_time && self.events == other.events
    }
}

impl<'a, T> AtomicSeries<'a, T> {
    /// Basis (issue) time
    pub fn basis_time(&self) -> Timestamp {
        self.basis_time
    }

    /// Events in ascending valid-time order
    pub fn events(&self) -> &'a [Event<T>] {
        self.events
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always false for a series that passed validation
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Lead duration of every event
    pub fn durations(&self) -> impl Iterator<Item = Duration> + 'a {
        let basis_time = self.basis_time;
        self.events
            .iter()
            .map(move |e| lead_duration(basis_time, e.time()))
    }

    /// Event at the given lead duration
    pub fn event_at(&self, lead: Duration) -> Option<&'a Event<T>> {
        self.events
            .binary_search_by(|e| lead_duration(self.basis_time, e.time()).cmp(&lead))
            .ok()
            .map(|i| &self.events[i])
    }
}

/// Basis times, durations and regularity derived once at construction
#[derive(Debug, Clone)]
struct Derived {
    basis_times: Arc<[Timestamp]>,
    durations: Arc<[Duration]>,
    regular_step: Option<Duration>,
}

impl Derived {
    fn of<T>(arena: &Arena<T>) -> Self {
        let basis_times: BTreeSet<Timestamp> = arena.spans().iter().map(|s| s.basis_time).collect();
        let durations: BTreeSet<Duration> = arena.atomic_iter().flat_map(|a| a.durations()).collect();

        Self {
            basis_times: basis_times.into_iter().collect(),
            durations: durations.into_iter().collect(),
            regular_step: Self::regular_step(arena),
        }
    }

    /// Constant gap shared by the duration sets of every atomic series
    fn regular_step<T>(arena: &Arena<T>) -> Option<Duration> {
        let mut atomics = arena.atomic_iter();
        let first: Vec<Duration> = atomics.next()?.durations().collect();
        if atomics.any(|a| !a.durations().eq(first.iter().copied())) {
            return None;
        }

        // A lone duration is its own step, whatever its sign
        let step = match first.as_slice() {
            [] => return None,
            [only] => return Some(*only),
            [a, b, ..] => *b - *a,
        };
        first.windows(2).all(|w| w[1] - w[0] == step).then_some(step)
    }
}

/// Immutable collection of atomic series with an optional baseline
#[derive(Debug)]
pub struct TimeSeries<T> {
    main: Arena<T>,
    baseline: Option<Arena<T>>,
    derived: Derived,
    metadata: Arc<SampleMetadata>,
    baseline_metadata: Arc<SampleMetadata>,
    climatology: Option<Climatology>,
}

impl<T> Clone for TimeSeries<T> {
    fn clone(&self) -> Self {
        Self {
            main: self.main.clone(),
            baseline: self.baseline.clone(),
            derived: self.derived.clone(),
            metadata: Arc::clone(&self.metadata),
            baseline_metadata: Arc::clone(&self.baseline_metadata),
            climatology: self.climatology.clone(),
        }
    }
}

impl<T: PartialEq> PartialEq for TimeSeries<T> {
    fn eq(&self, other: &Self) -> bool {
        self.main.atomic_iter().eq(other.main.atomic_iter())
            && match (&self.baseline, &other.baseline) {
                (Some(a), Some(b)) => a.atomic_iter().eq(b.atomic_iter()),
                (None, None) => true,
                _ => false,
            }
            && self.metadata == other.metadata
            && self.baseline_metadata == other.baseline_metadata
            && self.climatology == other.climatology
    }
}

impl<T> TimeSeries<T> {
    /// Series from already-validated parts
    pub(crate) fn from_parts(
        main: Arena<T>,
        baseline: Option<Arena<T>>,
        metadata: Arc<SampleMetadata>,
        baseline_metadata: Arc<SampleMetadata>,
        climatology: Option<Climatology>,
    ) -> Self {
        let derived = Derived::of(&main);
        Self {
            main,
            baseline,
            derived,
            metadata,
            baseline_metadata,
            climatology,
        }
    }

    /// Series sharing everything but the storage
    pub(crate) fn with_storage<U>(&self, main: Arena<U>, baseline: Option<Arena<U>>) -> TimeSeries<U> {
        TimeSeries::from_parts(
            main,
            baseline,
            Arc::clone(&self.metadata),
            Arc::clone(&self.baseline_metadata),
            self.climatology.clone(),
        )
    }

    pub(crate) fn main_arena(&self) -> &Arena<T> {
        &self.main
    }

    pub(crate) fn baseline_arena(&self) -> Option<&Arena<T>> {
        self.baseline.as_ref()
    }

    /// Every event, basis-time-major, ascending valid time within an atomic series
    pub fn time_iter(&self) -> TimeIter<'_, T> {
        TimeIter::new(self.main.events())
    }

    /// One sub-series per basis time, in registration order
    pub fn basis_time_iter(&self) -> BasisTimeIter<'_, T> {
        BasisTimeIter::new(self)
    }

    /// One sub-series per distinct lead duration, in ascending order
    pub fn duration_iter(&self) -> DurationIter<'_, T>
    where
        T: Clone,
    {
        DurationIter::new(self)
    }

    /// Atomic series in registration order
    pub fn atomic_series(&self) -> impl ExactSizeIterator<Item = AtomicSeries<'_, T>> + '_ {
        (0..self.main.spans().len()).map(move |i| self.main.atomic(i))
    }

    /// Baseline atomic series in registration order
    pub fn baseline(&self) -> impl Iterator<Item = AtomicSeries<'_, T>> + '_ {
        self.baseline.iter().flat_map(|b| b.atomic_iter())
    }

    /// Whether a baseline was registered
    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    /// Baseline as a series of its own, described by the baseline metadata
    pub fn baseline_series(&self) -> Option<TimeSeries<T>> {
        self.baseline.as_ref().map(|b| {
            TimeSeries::from_parts(
                b.clone(),
                None,
                Arc::clone(&self.baseline_metadata),
                Arc::clone(&self.baseline_metadata),
                self.climatology.clone(),
            )
        })
    }

    /// Sorted distinct basis times
    pub fn basis_times(&self) -> &[Timestamp] {
        &self.derived.basis_times
    }

    /// Sorted distinct lead durations across every event
    pub fn durations(&self) -> &[Duration] {
        &self.derived.durations
    }

    /// Earliest basis time
    pub fn earliest_basis_time(&self) -> Option<Timestamp> {
        self.derived.basis_times.first().copied()
    }

    /// Whether more than one atomic series is present
    pub fn has_multiple_time_series(&self) -> bool {
        self.main.spans().len() > 1
    }

    /// Number of atomic series
    pub fn series_count(&self) -> usize {
        self.main.spans().len()
    }

    /// Number of events across every atomic series
    pub fn event_count(&self) -> usize {
        self.main.events().len()
    }

    /// Whether every atomic series has the same duration set with a constant gap
    pub fn is_regular(&self) -> bool {
        self.derived.regular_step.is_some()
    }

    /// Step of a regular series
    ///
    /// A series whose atomic series each hold one event at the same lead has that lead
    /// as its step.
    pub fn regular_duration(&self) -> Option<Duration> {
        self.derived.regular_step
    }

    /// Metadata of the main series
    pub fn metadata(&self) -> &SampleMetadata {
        &self.metadata
    }

    /// Metadata of the baseline, equal to the main metadata unless set explicitly
    pub fn baseline_metadata(&self) -> &SampleMetadata {
        &self.baseline_metadata
    }

    /// Climatological reference data
    pub fn climatology(&self) -> Option<&Climatology> {
        self.climatology.as_ref()
    }

    /// Atomic series whose basis time matches the predicate
    ///
    /// The baseline is filtered with the same predicate. Returns `None` when no atomic
    /// series of the main series matches.
    pub fn filter_by_basis_time(&self, keep: impl Fn(Timestamp) -> bool) -> Option<TimeSeries<T>>
    where
        T: Clone,
    {
        let select = |atomic: AtomicSeries<'_, T>| -> Vec<Event<T>> {
            if keep(atomic.basis_time()) {
                atomic.events().to_vec()
            } else {
                Vec::new()
            }
        };
        let main = self.main.rebuild(select)?;
        let baseline = self.baseline.as_ref().and_then(|b| b.rebuild(select));
        Some(self.with_storage(main, baseline))
    }

    /// Events whose lead duration matches the predicate
    ///
    /// Atomic series left without events are dropped. Returns `None` when no event of
    /// the main series matches.
    pub fn filter_by_duration(&self, keep: impl Fn(Duration) -> bool) -> Option<TimeSeries<T>>
    where
        T: Clone,
    {
        let select = |atomic: AtomicSeries<'_, T>| -> Vec<Event<T>> {
            atomic
                .events()
                .iter()
                .filter(|e| keep(lead_duration(atomic.basis_time(), e.time())))
                .cloned()
                .collect()
        };
        let main = self.main.rebuild(select)?;
        let baseline = self.baseline.as_ref().and_then(|b| b.rebuild(select));
        Some(self.with_storage(main, baseline))
    }
}

/// Atomic series under construction, keyed by basis time in registration order
#[derive(Debug)]
pub(crate) struct Groups<T> {
    order: Vec<(Timestamp, Vec<Event<T>>)>,
    index: HashMap<Timestamp, usize>,
}

impl<T> Default for Groups<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Sample> Groups<T> {
    fn add(&mut self, basis_time: Timestamp, events: impl IntoIterator<Item = Event<T>>) {
        let position = *self.index.entry(basis_time).or_insert_with(|| {
            self.order.push((basis_time, Vec::new()));
            self.order.len() - 1
        });
        self.order[position].1.extend(events);
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn validate(&self) -> std::result::Result<(), DataError> {
        for (basis_time, events) in &self.order {
            let basis_time = *basis_time;
            let first = events.first().ok_or(DataError::EmptySeries { basis_time })?;

            if let Some(pair) = events.windows(2).find(|w| w[1].time() <= w[0].time()) {
                return Err(DataError::UnorderedEvents {
                    basis_time,
                    valid_time: pair[1].time(),
                });
            }

            if let Some(expected) = first.value().member_count() {
                for event in events {
                    let actual = event.value().member_count().unwrap_or(0);
                    if actual != expected {
                        return Err(DataError::EnsembleWidthMismatch {
                            basis_time,
                            expected,
                            actual,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn into_arena(self) -> Arena<T> {
        Arena::from_groups(self.order)
    }
}

/// Resolve the metadata contributions of a builder
///
/// Identical contributions keep their threshold; differing ones are unioned.
fn resolve_metadata(contributions: &[SampleMetadata]) -> std::result::Result<Option<SampleMetadata>, DataError> {
    match contributions {
        [] => Ok(None),
        [first, rest @ ..] if rest.iter().all(|m| m == first) => Ok(Some(first.clone())),
        all => SampleMetadata::union_of(all).map(Some),
    }
}

/// Builder for [`TimeSeries`]
#[derive(Debug)]
pub struct TimeSeriesBuilder<T> {
    main: Groups<T>,
    baseline: Groups<T>,
    metadata: Vec<SampleMetadata>,
    baseline_metadata: Vec<SampleMetadata>,
    climatology: Option<Climatology>,
}

impl<T> Default for TimeSeriesBuilder<T> {
    fn default() -> Self {
        Self {
            main: Groups::default(),
            baseline: Groups::default(),
            metadata: Vec::new(),
            baseline_metadata: Vec::new(),
            climatology: None,
        }
    }
}

impl<T: Sample> TimeSeriesBuilder<T> {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an atomic series
    ///
    /// Events for a basis time that was already added are appended to it.
    pub fn add_series(mut self, basis_time: Timestamp, events: impl IntoIterator<Item = Event<T>>) -> Self {
        self.main.add(basis_time, events);
        self
    }

    /// Add a baseline atomic series
    pub fn add_baseline_series(
        mut self,
        basis_time: Timestamp,
        events: impl IntoIterator<Item = Event<T>>,
    ) -> Self {
        self.baseline.add(basis_time, events);
        self
    }

    /// Set the main metadata
    ///
    /// Metadata set more than once, or merged from other series, is unioned at build.
    pub fn with_metadata(mut self, metadata: SampleMetadata) -> Self {
        self.metadata.push(metadata);
        self
    }

    /// Set the baseline metadata
    pub fn with_baseline_metadata(mut self, metadata: SampleMetadata) -> Self {
        self.baseline_metadata.push(metadata);
        self
    }

    /// Set the climatology; the first one supplied is kept
    pub fn with_climatology(mut self, climatology: Climatology) -> Self {
        self.climatology.get_or_insert(climatology);
        self
    }

    /// Add every atomic series, baseline series, metadata and climatology of a series
    pub fn merge(mut self, series: &TimeSeries<T>) -> Self {
        for atomic in series.atomic_series() {
            self.main.add(atomic.basis_time(), atomic.events().iter().cloned());
        }
        for atomic in series.baseline() {
            self.baseline.add(atomic.basis_time(), atomic.events().iter().cloned());
        }
        self.metadata.push(series.metadata().clone());
        if series.has_baseline() {
            self.baseline_metadata.push(series.baseline_metadata().clone());
        }
        if let Some(climatology) = series.climatology() {
            self.climatology.get_or_insert_with(|| climatology.clone());
        }
        self
    }

    pub(crate) fn build_series(self) -> std::result::Result<TimeSeries<T>, DataError> {
        if self.main.is_empty() {
            return Err(DataError::Empty(
                "a time-series requires at least one atomic series".to_string(),
            ));
        }
        self.main.validate()?;
        self.baseline.validate()?;

        let metadata = resolve_metadata(&self.metadata)?.unwrap_or_default();
        let baseline_metadata =
            resolve_metadata(&self.baseline_metadata)?.unwrap_or_else(|| metadata.clone());

        let baseline = if self.baseline.is_empty() {
            None
        } else {
            Some(self.baseline.into_arena())
        };

        Ok(TimeSeries::from_parts(
            self.main.into_arena(),
            baseline,
            Arc::new(metadata),
            Arc::new(baseline_metadata),
            self.climatology,
        ))
    }

    /// Validate and freeze the series
    ///
    /// # Errors
    ///
    /// Fails with invalid input when no atomic series was added, an atomic series has
    /// no events, events are not strictly ascending in valid time, ensemble widths
    /// differ within an atomic series, or metadata cannot be unioned.
    pub fn build(self) -> Result<TimeSeries<T>> {
        let series = self.build_series()?;
        crate::metrics::record_series_built("irregular");
        debug!(
            series = series.series_count(),
            events = series.event_count(),
            baseline = series.has_baseline(),
            regular = series.is_regular(),
            "Built time-series"
        );
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::metadata::MeasurementUnit;
    use crate::types::{EnsemblePair, SingleValuedPair};
    use chrono::TimeZone;
    use chrono::Utc;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(1985, 1, 1, 0, 0, 0).unwrap()
    }

    fn events(basis: Timestamp, hours: &[i64]) -> Vec<Event<SingleValuedPair>> {
        hours
            .iter()
            .map(|&h| Event::new(basis + Duration::hours(h), SingleValuedPair::new(h as f64, h as f64 + 0.5)))
            .collect()
    }

    #[test]
    fn test_build_requires_atomic_series() {
        let result = TimeSeriesBuilder::<f64>::new().build();
        assert!(matches!(result, Err(Error::InvalidInput(DataError::Empty(_)))));
    }

    #[test]
    fn test_empty_atomic_series_rejected() {
        let result = TimeSeriesBuilder::<f64>::new().add_series(t0(), Vec::new()).build();
        assert!(matches!(
            result,
            Err(Error::InvalidInput(DataError::EmptySeries { .. }))
        ));
    }

    #[test]
    fn test_unordered_events_rejected() {
        let result = TimeSeriesBuilder::new()
            .add_series(t0(), events(t0(), &[2, 1]))
            .build();
        assert!(matches!(
            result,
            Err(Error::InvalidInput(DataError::UnorderedEvents { .. }))
        ));

        // Duplicate valid times are not strictly ascending either
        let result = TimeSeriesBuilder::new()
            .add_series(t0(), events(t0(), &[1, 2]))
            .add_series(t0(), events(t0(), &[2]))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_ensemble_width_validated_per_atomic_series() {
        let pair = |n: usize| EnsemblePair::new(1.0, vec![1.0; n]).unwrap();
        let t1 = t0() + Duration::hours(24);

        let ok = TimeSeriesBuilder::new()
            .add_series(t0(), vec![Event::new(t0() + Duration::hours(1), pair(3))])
            .add_series(t1, vec![Event::new(t1 + Duration::hours(1), pair(5))])
            .build();
        assert!(ok.is_ok());

        let bad = TimeSeriesBuilder::new()
            .add_series(
                t0(),
                vec![
                    Event::new(t0() + Duration::hours(1), pair(3)),
                    Event::new(t0() + Duration::hours(2), pair(4)),
                ],
            )
            .build();
        assert!(matches!(
            bad,
            Err(Error::InvalidInput(DataError::EnsembleWidthMismatch {
                expected: 3,
                actual: 4,
                ..
            }))
        ));
    }

    #[test]
    fn test_repeated_basis_time_appends() {
        let series = TimeSeriesBuilder::new()
            .add_series(t0(), events(t0(), &[1, 2]))
            .add_series(t0(), events(t0(), &[3]))
            .build()
            .unwrap();
        assert_eq!(series.series_count(), 1);
        assert_eq!(series.event_count(), 3);
    }

    #[test]
    fn test_derived_sets_and_regularity() {
        let t1 = t0() + Duration::hours(6);
        let series = TimeSeriesBuilder::new()
            .add_series(t1, events(t1, &[1, 2, 3]))
            .add_series(t0(), events(t0(), &[1, 2, 3]))
            .build()
            .unwrap();

        assert_eq!(series.basis_times(), &[t0(), t1]);
        assert_eq!(
            series.durations(),
            &[Duration::hours(1), Duration::hours(2), Duration::hours(3)]
        );
        assert_eq!(series.earliest_basis_time(), Some(t0()));
        assert!(series.has_multiple_time_series());
        assert_eq!(series.regular_duration(), Some(Duration::hours(1)));

        let irregular = TimeSeriesBuilder::new()
            .add_series(t0(), events(t0(), &[1, 2, 4]))
            .build()
            .unwrap();
        assert!(!irregular.is_regular());

        let mismatched = TimeSeriesBuilder::new()
            .add_series(t0(), events(t0(), &[1, 2]))
            .add_series(t1, events(t1, &[1, 2, 3]))
            .build()
            .unwrap();
        assert!(!mismatched.is_regular());
    }

    #[test]
    fn test_single_duration_step_is_the_duration() {
        let series = TimeSeriesBuilder::new()
            .add_series(t0(), events(t0(), &[6]))
            .build()
            .unwrap();
        assert_eq!(series.regular_duration(), Some(Duration::hours(6)));
    }

    #[test]
    fn test_single_zero_lead_is_regular() {
        let t1 = t0() + Duration::hours(24);
        let series = TimeSeriesBuilder::new()
            .add_series(t0(), events(t0(), &[0]))
            .add_series(t1, events(t1, &[0]))
            .build()
            .unwrap();

        assert_eq!(series.durations(), &[Duration::zero()]);
        assert!(series.is_regular());
        assert_eq!(series.regular_duration(), Some(Duration::zero()));
    }

    #[test]
    fn test_baseline_metadata_defaults_to_main() {
        let metadata = SampleMetadata::of(MeasurementUnit::new("CMS"));
        let series = TimeSeriesBuilder::new()
            .add_series(t0(), events(t0(), &[1]))
            .add_baseline_series(t0(), events(t0(), &[1]))
            .with_metadata(metadata.clone())
            .build()
            .unwrap();
        assert!(series.has_baseline());
        assert_eq!(series.baseline_metadata(), &metadata);
        assert_eq!(series.baseline_series().unwrap().event_count(), 1);
    }

    #[test]
    fn test_merge_rejects_different_units() {
        let cms = TimeSeriesBuilder::new()
            .add_series(t0(), events(t0(), &[1]))
            .with_metadata(SampleMetadata::of(MeasurementUnit::new("CMS")))
            .build()
            .unwrap();
        let result = TimeSeriesBuilder::new()
            .merge(&cms)
            .with_metadata(SampleMetadata::of(MeasurementUnit::new("CFS")))
            .build();
        assert!(matches!(
            result,
            Err(Error::InvalidInput(DataError::MetadataMismatch(_)))
        ));
    }

    #[test]
    fn test_irregular_filters() {
        let t1 = t0() + Duration::hours(12);
        let series = TimeSeriesBuilder::new()
            .add_series(t0(), events(t0(), &[1, 3]))
            .add_series(t1, events(t1, &[2, 5]))
            .build()
            .unwrap();

        let early = series.filter_by_basis_time(|b| b == t0()).unwrap();
        assert_eq!(early.series_count(), 1);
        assert!(series.filter_by_basis_time(|_| false).is_none());

        let long = series.filter_by_duration(|d| d >= Duration::hours(3)).unwrap();
        assert_eq!(long.event_count(), 2);
        assert_eq!(long.durations(), &[Duration::hours(3), Duration::hours(5)]);
        assert!(series.filter_by_duration(|d| d > Duration::hours(9)).is_none());
    }

    #[test]
    fn test_atomic_event_lookup() {
        let series = TimeSeriesBuilder::new()
            .add_series(t0(), events(t0(), &[1, 3, 7]))
            .build()
            .unwrap();
        let atomic = series.atomic_series().next().unwrap();
        assert_eq!(atomic.event_at(Duration::hours(3)).unwrap().value().left(), 3.0);
        assert!(atomic.event_at(Duration::hours(2)).is_none());
    }
}
