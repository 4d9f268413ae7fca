//! Integration tests for irregular, regular and ensemble time-series
//!
//! Covers iteration order, derived duration sets, filters, merging and the
//! invalid-input paths of the builders.

use chrono::{Duration, TimeZone, Utc};
use hydroverify::error::{DataError, Error};
use hydroverify::metadata::{DatasetIdentifier, MeasurementUnit, SampleMetadata};
use hydroverify::series::{RegularTimeSeriesBuilder, TimeSeriesBuilder};
use hydroverify::time::TimeWindow;
use hydroverify::types::{Climatology, EnsemblePair, Event, SingleValuedPair, Timestamp};

// ============================================================================
// Helpers
// ============================================================================

fn basis(day: u32) -> Timestamp {
    Utc.with_ymd_and_hms(1985, 1, day, 12, 0, 0).unwrap()
}

/// Events at `basis + k * step` for k in 1..=count
fn regular_events(basis: Timestamp, count: i64, step: Duration) -> Vec<Event<SingleValuedPair>> {
    (1..=count)
        .map(|k| Event::new(basis + step * k as i32, SingleValuedPair::new(k as f64, k as f64 + 0.5)))
        .collect()
}

fn metadata(window: TimeWindow) -> SampleMetadata {
    SampleMetadata::builder()
        .unit(MeasurementUnit::new("CMS"))
        .identifier(DatasetIdentifier::new("DRRC2", "STREAMFLOW", "HEFS"))
        .time_window(window)
        .build()
}

// ============================================================================
// Irregular series
// ============================================================================

#[test]
fn test_time_iter_yields_every_event_basis_major() {
    let counts = [3_i64, 1, 4];
    let mut builder = TimeSeriesBuilder::new();
    for (i, &count) in counts.iter().enumerate() {
        let b = basis(i as u32 + 1);
        let events: Vec<_> = (1..=count)
            .map(|h| Event::new(b + Duration::hours(h * 5), SingleValuedPair::new(0.0, 0.0)))
            .collect();
        builder = builder.add_series(b, events);
    }
    let series = builder.build().unwrap();

    assert_eq!(series.time_iter().count(), 8);
    assert_eq!(series.event_count(), 8);
    assert_eq!(series.series_count(), 3);
    assert!(series.has_multiple_time_series());

    // Ascending within each issuance, issuances in registration order
    for atomic in series.atomic_series() {
        assert!(atomic.events().windows(2).all(|w| w[0].time() < w[1].time()));
    }
    let firsts: Vec<_> = series.atomic_series().map(|a| a.basis_time()).collect();
    assert_eq!(firsts, vec![basis(1), basis(2), basis(3)]);

    // Irregular: 5h, 10h, 15h, 20h across series but not the same set in each
    assert!(!series.is_regular());
    assert_eq!(series.durations().len(), 4);
}

#[test]
fn test_irregular_filters_use_empty_marker() {
    let series = TimeSeriesBuilder::new()
        .add_series(basis(1), regular_events(basis(1), 3, Duration::hours(6)))
        .add_series(basis(2), regular_events(basis(2), 2, Duration::hours(6)))
        .build()
        .unwrap();

    assert!(series.filter_by_basis_time(|_| false).is_none());
    assert_eq!(series.filter_by_basis_time(|_| true).unwrap(), series);

    let late = series.filter_by_duration(|d| d > Duration::hours(12)).unwrap();
    assert_eq!(late.series_count(), 1);
    assert_eq!(late.basis_times(), &[basis(1)]);
    assert!(series.filter_by_duration(|d| d > Duration::days(2)).is_none());
}

#[test]
fn test_basis_time_round_trip() {
    let window = TimeWindow::of_leads(Duration::hours(1), Duration::hours(4)).unwrap();
    let series = TimeSeriesBuilder::new()
        .add_series(basis(1), regular_events(basis(1), 4, Duration::hours(1)))
        .add_series(basis(2), regular_events(basis(2), 2, Duration::hours(2)))
        .add_baseline_series(basis(2), regular_events(basis(2), 2, Duration::hours(2)))
        .with_metadata(metadata(window))
        .with_climatology(Climatology::new(vec![3.0, 1.0, 2.0]).unwrap())
        .build()
        .unwrap();

    let rebuilt = series
        .basis_time_iter()
        .fold(TimeSeriesBuilder::new(), |builder, sub| builder.merge(&sub))
        .build()
        .unwrap();

    assert_eq!(rebuilt, series);
    assert_eq!(rebuilt.metadata().time_window(), Some(&window));
    assert_eq!(rebuilt.climatology().unwrap().values(), &[1.0, 2.0, 3.0]);
}

#[test]
fn test_merge_unions_metadata_windows() {
    let early = TimeSeriesBuilder::new()
        .add_series(basis(1), regular_events(basis(1), 2, Duration::hours(1)))
        .with_metadata(metadata(TimeWindow::of_leads(Duration::hours(1), Duration::hours(2)).unwrap()))
        .build()
        .unwrap();
    let late = TimeSeriesBuilder::new()
        .add_series(basis(2), regular_events(basis(2), 2, Duration::hours(1)))
        .with_metadata(metadata(TimeWindow::of_leads(Duration::hours(3), Duration::hours(4)).unwrap()))
        .build()
        .unwrap();

    let merged = TimeSeriesBuilder::new().merge(&early).merge(&late).build().unwrap();
    let window = merged.metadata().time_window().unwrap();
    assert_eq!(window.earliest_lead(), Duration::hours(1));
    assert_eq!(window.latest_lead(), Duration::hours(4));
    assert_eq!(merged.series_count(), 2);
}

#[test]
fn test_merge_rejects_mismatched_units() {
    let cms = TimeSeriesBuilder::new()
        .add_series(basis(1), regular_events(basis(1), 1, Duration::hours(1)))
        .with_metadata(SampleMetadata::of(MeasurementUnit::new("CMS")))
        .build()
        .unwrap();
    let cfs = TimeSeriesBuilder::new()
        .add_series(basis(2), regular_events(basis(2), 1, Duration::hours(1)))
        .with_metadata(SampleMetadata::of(MeasurementUnit::new("CFS")))
        .build()
        .unwrap();

    let result = TimeSeriesBuilder::new().merge(&cms).merge(&cfs).build();
    assert!(matches!(
        result,
        Err(Error::InvalidInput(DataError::MetadataMismatch(_)))
    ));
}

#[test]
fn test_builder_rejects_invalid_input() {
    let empty = TimeSeriesBuilder::<SingleValuedPair>::new().build();
    assert!(matches!(empty, Err(Error::InvalidInput(DataError::Empty(_)))));

    let unordered = TimeSeriesBuilder::new()
        .add_series(
            basis(1),
            vec![
                Event::new(basis(1) + Duration::hours(2), SingleValuedPair::new(0.0, 0.0)),
                Event::new(basis(1) + Duration::hours(1), SingleValuedPair::new(0.0, 0.0)),
            ],
        )
        .build();
    assert!(matches!(
        unordered,
        Err(Error::InvalidInput(DataError::UnorderedEvents { .. }))
    ));

    let ragged = TimeSeriesBuilder::new()
        .add_series(
            basis(1),
            vec![
                Event::new(basis(1) + Duration::hours(1), EnsemblePair::new(1.0, vec![1.0, 2.0]).unwrap()),
                Event::new(basis(1) + Duration::hours(2), EnsemblePair::new(1.0, vec![1.0]).unwrap()),
            ],
        )
        .build();
    assert!(matches!(
        ragged,
        Err(Error::InvalidInput(DataError::EnsembleWidthMismatch { expected: 2, actual: 1, .. }))
    ));
}

// ============================================================================
// Regular series
// ============================================================================

#[test]
fn test_regular_duration_scenario() {
    let step = Duration::hours(1);
    let series = RegularTimeSeriesBuilder::new()
        .with_time_step(step)
        .add_series(basis(1), regular_events(basis(1), 4, step))
        .add_series(basis(2), regular_events(basis(2), 4, step))
        .add_series(basis(3), regular_events(basis(3), 4, step))
        .build()
        .unwrap();

    assert_eq!(
        series.durations(),
        &[Duration::hours(1), Duration::hours(2), Duration::hours(3), Duration::hours(4)]
    );
    assert!(series
        .durations()
        .windows(2)
        .all(|w| w[1] - w[0] == series.time_step()));

    let at_two = series
        .filter_by_duration(|d| d == Duration::hours(2))
        .unwrap()
        .unwrap();
    assert_eq!(at_two.time_step(), Duration::hours(2));
    assert_eq!(at_two.event_count(), 3);
    assert_eq!(at_two.series_count(), 3);
}

#[test]
fn test_regular_duration_iter_yields_one_event_per_issuance() {
    let step = Duration::hours(6);
    let series = RegularTimeSeriesBuilder::new()
        .with_time_step(step)
        .add_series(basis(1), regular_events(basis(1), 5, step))
        .add_series(basis(2), regular_events(basis(2), 5, step))
        .build()
        .unwrap();

    let subs: Vec<_> = series.duration_iter().collect();
    assert_eq!(subs.len(), 5);
    for (k, sub) in subs.iter().enumerate() {
        assert_eq!(sub.event_count(), 2);
        assert_eq!(sub.time_step(), step * (k as i32 + 1));
        assert!(sub.atomic_series().all(|a| a.len() == 1));
    }
}

#[test]
fn test_regular_round_trip_and_filters() {
    let step = Duration::hours(3);
    let series = RegularTimeSeriesBuilder::new()
        .with_time_step(step)
        .add_series(basis(1), regular_events(basis(1), 2, step))
        .add_series(basis(2), regular_events(basis(2), 2, step))
        .add_baseline_series(basis(1), regular_events(basis(1), 2, step))
        .build()
        .unwrap();

    let rebuilt = series
        .basis_time_iter()
        .try_fold(RegularTimeSeriesBuilder::new(), |builder, sub| builder.merge(&sub))
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(rebuilt, series);

    assert!(series.filter_by_basis_time(|_| false).is_none());
    assert_eq!(series.filter_by_basis_time(|_| true).unwrap(), series);
    assert!(series.filter_by_duration(|_| false).unwrap().is_none());

    // 3h and 6h kept: evenly spaced from the first
    let both = series.filter_by_duration(|_| true).unwrap().unwrap();
    assert_eq!(both, series);
}

#[test]
fn test_regular_filter_rejects_irregular_result() {
    let step = Duration::hours(1);
    let series = RegularTimeSeriesBuilder::new()
        .with_time_step(step)
        .add_series(basis(1), regular_events(basis(1), 4, step))
        .build()
        .unwrap();

    let result = series.filter_by_duration(|d| d == Duration::hours(2) || d == Duration::hours(3));
    assert!(matches!(
        result,
        Err(Error::InvalidInput(DataError::IrregularFilter(_)))
    ));
}

#[test]
fn test_regular_builder_rejects_inconsistent_steps() {
    let missing = RegularTimeSeriesBuilder::new()
        .add_series(basis(1), regular_events(basis(1), 2, Duration::hours(1)))
        .build();
    assert!(matches!(
        missing,
        Err(Error::InvalidInput(DataError::InvalidTimeStep(None)))
    ));

    let counts = RegularTimeSeriesBuilder::new()
        .with_time_step(Duration::hours(1))
        .add_series(basis(1), regular_events(basis(1), 2, Duration::hours(1)))
        .add_series(basis(2), regular_events(basis(2), 3, Duration::hours(1)))
        .build();
    assert!(matches!(
        counts,
        Err(Error::InvalidInput(DataError::StepCountMismatch { kind: "main", .. }))
    ));

    let six = RegularTimeSeriesBuilder::new()
        .with_time_step(Duration::hours(6))
        .add_series(basis(1), regular_events(basis(1), 1, Duration::hours(6)))
        .build()
        .unwrap();
    let merged = RegularTimeSeriesBuilder::new()
        .with_time_step(Duration::hours(1))
        .merge(&six);
    assert!(matches!(
        merged,
        Err(Error::InvalidInput(DataError::TimeStepMismatch { .. }))
    ));
}

// ============================================================================
// Ensembles
// ============================================================================

#[test]
fn test_ensemble_traces_preserve_basis_and_climatology() {
    let step = Duration::hours(1);
    let ensemble = |b: Timestamp| -> Vec<Event<EnsemblePair>> {
        (1..=3)
            .map(|k| {
                Event::new(
                    b + step * k,
                    EnsemblePair::new(k as f64, vec![k as f64, k as f64 * 2.0]).unwrap(),
                )
            })
            .collect()
    };
    let series = RegularTimeSeriesBuilder::new()
        .with_time_step(step)
        .add_series(basis(1), ensemble(basis(1)))
        .add_series(basis(2), ensemble(basis(2)))
        .with_climatology(Climatology::new(vec![f64::NAN, 5.0]).unwrap())
        .build()
        .unwrap();

    let traces: Vec<_> = series.ensemble_trace_iter().collect();
    assert_eq!(traces.len(), 4);
    assert!(traces.iter().all(|t| t.climatology().is_some()));
    assert!(traces.iter().all(|t| t.event_count() == 3));
    assert_eq!(traces[2].basis_times(), &[basis(2)]);

    let second_member: Vec<f64> = traces[1].time_iter().map(|e| e.value().right()).collect();
    assert_eq!(second_member, vec![2.0, 4.0, 6.0]);

    let first_only = series.filter_by_trace_index(|i| i == 0).unwrap();
    assert!(first_only.time_iter().all(|e| e.value().width() == 1));
}
