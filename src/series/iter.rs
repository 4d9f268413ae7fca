//! Iteration views over a [`TimeSeries`]

use std::collections::HashMap;
use std::iter::FusedIterator;

use chrono::Duration;

use super::{Arena, TimeSeries};
use crate::types::{Event, Timestamp};

/// Flat view over every event
///
/// Yields events basis-time-major in registration order, ascending valid time within
/// each atomic series.
#[derive(Debug)]
pub struct TimeIter<'a, T> {
    inner: std::slice::Iter<'a, Event<T>>,
}

impl<'a, T> TimeIter<'a, T> {
    pub(crate) fn new(events: &'a [Event<T>]) -> Self {
        Self {
            inner: events.iter(),
        }
    }
}

impl<T> Clone for TimeIter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, T> Iterator for TimeIter<'a, T> {
    type Item = &'a Event<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for TimeIter<'_, T> {}

impl<T> FusedIterator for TimeIter<'_, T> {}

/// Per-issuance view
///
/// Each sub-series shares the storage of the parent and carries the baseline atomic
/// series registered under the same basis time, if any.
#[derive(Debug)]
pub struct BasisTimeIter<'a, T> {
    series: &'a TimeSeries<T>,
    baseline_positions: HashMap<Timestamp, usize>,
    next: usize,
}

impl<'a, T> BasisTimeIter<'a, T> {
    pub(crate) fn new(series: &'a TimeSeries<T>) -> Self {
        let baseline_positions = series
            .baseline_arena()
            .map(Arena::positions)
            .unwrap_or_default();
        Self {
            series,
            baseline_positions,
            next: 0,
        }
    }
}

impl<T> Clone for BasisTimeIter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            series: self.series,
            baseline_positions: self.baseline_positions.clone(),
            next: self.next,
        }
    }
}

impl<T> Iterator for BasisTimeIter<'_, T> {
    type Item = TimeSeries<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let main = self.series.main_arena();
        let span = *main.spans().get(self.next)?;
        let index = self.next;
        self.next += 1;

        let baseline = self.series.baseline_arena().and_then(|b| {
            self.baseline_positions
                .get(&span.basis_time)
                .map(|&position| b.narrow(position))
        });
        Some(self.series.with_storage(main.narrow(index), baseline))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.series.series_count() - self.next;
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for BasisTimeIter<'_, T> {}

impl<T> FusedIterator for BasisTimeIter<'_, T> {}

/// Per-lead-duration view
///
/// Each sub-series gathers the event at one lead duration from every atomic series,
/// and from every baseline atomic series.
#[derive(Debug)]
pub struct DurationIter<'a, T> {
    series: &'a TimeSeries<T>,
    next: usize,
}

impl<'a, T> DurationIter<'a, T> {
    pub(crate) fn new(series: &'a TimeSeries<T>) -> Self {
        Self { series, next: 0 }
    }
}

impl<T> Clone for DurationIter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            series: self.series,
            next: self.next,
        }
    }
}

/// Events at exactly `lead` from every atomic series of an arena
pub(crate) fn gather_at<T: Clone>(arena: &Arena<T>, lead: Duration) -> Option<Arena<T>> {
    arena.rebuild(|atomic| atomic.event_at(lead).cloned().into_iter().collect())
}

impl<T: Clone> Iterator for DurationIter<'_, T> {
    type Item = TimeSeries<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let lead = *self.series.durations().get(self.next)?;
        self.next += 1;

        // Every derived duration occurs in at least one atomic series
        let main = gather_at(self.series.main_arena(), lead)?;
        let baseline = self
            .series
            .baseline_arena()
            .and_then(|b| gather_at(b, lead));
        Some(self.series.with_storage(main, baseline))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.series.durations().len() - self.next;
        (remaining, Some(remaining))
    }
}

impl<T: Clone> ExactSizeIterator for DurationIter<'_, T> {}

impl<T: Clone> FusedIterator for DurationIter<'_, T> {}
