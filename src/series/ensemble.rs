//! Ensemble operations: trace selection and decomposition into single-valued traces

use std::collections::HashMap;
use std::iter::FusedIterator;

use super::{Arena, AtomicSeries, RegularTimeSeries, TimeSeries};
use crate::types::{EnsemblePair, Event, SingleValuedPair, Timestamp};

/// Events of an atomic series restricted to the retained members
///
/// `None` when an event keeps no member.
fn select_traces(
    atomic: AtomicSeries<'_, EnsemblePair>,
    keep: &impl Fn(usize) -> bool,
) -> Option<Vec<Event<EnsemblePair>>> {
    atomic
        .events()
        .iter()
        .map(|e| {
            e.value()
                .select_members(keep)
                .map(|pair| Event::new(e.time(), pair))
        })
        .collect()
}

fn select_arena(arena: &Arena<EnsemblePair>, keep: &impl Fn(usize) -> bool) -> Option<Arena<EnsemblePair>> {
    let groups = arena
        .atomic_iter()
        .map(|atomic| select_traces(atomic, keep).map(|events| (atomic.basis_time(), events)))
        .collect::<Option<Vec<_>>>()?;
    Some(Arena::from_groups(groups))
}

fn trace_events(atomic: AtomicSeries<'_, EnsemblePair>, member: usize) -> Vec<Event<SingleValuedPair>> {
    atomic
        .events()
        .iter()
        .filter_map(|e| e.value().trace(member).map(|pair| Event::new(e.time(), pair)))
        .collect()
}

fn width(atomic: AtomicSeries<'_, EnsemblePair>) -> usize {
    atomic.events().first().map_or(0, |e| e.value().width())
}

impl TimeSeries<EnsemblePair> {
    /// Ensemble series keeping the members whose index matches the predicate
    ///
    /// Applies to the main and the baseline series. Returns `None` when an atomic
    /// series would keep no member.
    pub fn filter_by_trace_index(&self, keep: impl Fn(usize) -> bool) -> Option<Self> {
        let main = select_arena(self.main_arena(), &keep)?;
        let baseline = match self.baseline_arena() {
            Some(b) => Some(select_arena(b, &keep)?),
            None => None,
        };
        Some(self.with_storage(main, baseline))
    }
}

impl RegularTimeSeries<EnsemblePair> {
    /// Ensemble series keeping the members whose index matches the predicate
    pub fn filter_by_trace_index(&self, keep: impl Fn(usize) -> bool) -> Option<Self> {
        let series = self.as_series().filter_by_trace_index(keep)?;
        Some(Self::from_parts_unchecked(series, self.time_step()))
    }

    /// One single-valued series per basis time and member trace
    ///
    /// Ordered basis-time-major, then by member index. Each trace keeps the basis
    /// time, step, metadata and climatology, plus the same trace of the baseline
    /// atomic series issued at that basis time when the baseline has it.
    pub fn ensemble_trace_iter(&self) -> EnsembleTraceIter<'_> {
        let remaining = self.main_arena().atomic_iter().map(width).sum();
        let baseline_positions = self
            .baseline_arena()
            .map(Arena::positions)
            .unwrap_or_default();
        EnsembleTraceIter {
            series: self,
            baseline_positions,
            span: 0,
            member: 0,
            remaining,
        }
    }
}

/// Decomposition of a regular ensemble series into single-valued traces
#[derive(Debug, Clone)]
pub struct EnsembleTraceIter<'a> {
    series: &'a RegularTimeSeries<EnsemblePair>,
    baseline_positions: HashMap<Timestamp, usize>,
    span: usize,
    member: usize,
    remaining: usize,
}

impl Iterator for EnsembleTraceIter<'_> {
    type Item = RegularTimeSeries<SingleValuedPair>;

    fn next(&mut self) -> Option<Self::Item> {
        let main = self.series.main_arena();
        let (atomic, member) = loop {
            if self.span >= main.spans().len() {
                return None;
            }
            let atomic = main.atomic(self.span);
            if self.member < width(atomic) {
                break (atomic, self.member);
            }
            self.span += 1;
            self.member = 0;
        };
        self.member += 1;
        self.remaining = self.remaining.saturating_sub(1);

        let basis_time = atomic.basis_time();
        let trace = Arena::from_groups([(basis_time, trace_events(atomic, member))]);
        let baseline = self.series.baseline_arena().and_then(|b| {
            let position = *self.baseline_positions.get(&basis_time)?;
            let events = trace_events(b.atomic(position), member);
            (!events.is_empty()).then(|| Arena::from_groups([(basis_time, events)]))
        });

        Some(RegularTimeSeries::from_parts_unchecked(
            self.series.with_storage(trace, baseline),
            self.series.time_step(),
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EnsembleTraceIter<'_> {}

impl FusedIterator for EnsembleTraceIter<'_> {}
