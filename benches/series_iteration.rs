//! Time-Series Iteration Benchmarks
//!
//! Measures construction and the three iteration views over forecast collections of
//! increasing size.

use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hydroverify::series::{RegularTimeSeries, RegularTimeSeriesBuilder, TimeSeriesBuilder};
use hydroverify::types::{EnsemblePair, Event, SingleValuedPair, Timestamp};
use std::hint::black_box;

// =============================================================================
// Test Data Generators
// =============================================================================

const STEP_HOURS: i64 = 6;

fn basis(index: usize) -> Timestamp {
    Utc.with_ymd_and_hms(1985, 1, 1, 12, 0, 0).unwrap() + Duration::days(index as i64)
}

/// One issuance of `leads` six-hourly single-valued pairs
fn forecast(basis: Timestamp, leads: usize) -> Vec<Event<SingleValuedPair>> {
    (1..=leads as i64)
        .map(|k| {
            let flow = 100.0 + (k as f64 * 0.3).sin() * 25.0;
            Event::new(
                basis + Duration::hours(k * STEP_HOURS),
                SingleValuedPair::new(flow, flow * 1.05),
            )
        })
        .collect()
}

fn create_regular(issuances: usize, leads: usize) -> RegularTimeSeries<SingleValuedPair> {
    (0..issuances)
        .fold(
            RegularTimeSeriesBuilder::new().with_time_step(Duration::hours(STEP_HOURS)),
            |b, i| b.add_series(basis(i), forecast(basis(i), leads)),
        )
        .build()
        .unwrap()
}

fn create_ensemble(issuances: usize, leads: usize, members: usize) -> RegularTimeSeries<EnsemblePair> {
    (0..issuances)
        .fold(
            RegularTimeSeriesBuilder::new().with_time_step(Duration::hours(STEP_HOURS)),
            |b, i| {
                let events = (1..=leads as i64).map(|k| {
                    let spread: Vec<f64> = (0..members).map(|m| 90.0 + m as f64 + k as f64).collect();
                    Event::new(
                        basis(i) + Duration::hours(k * STEP_HOURS),
                        EnsemblePair::new(100.0, spread).unwrap(),
                    )
                });
                b.add_series(basis(i), events)
            },
        )
        .build()
        .unwrap()
}

// =============================================================================
// Construction Benchmarks
// =============================================================================

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for issuances in [10, 100, 1000] {
        let inputs: Vec<_> = (0..issuances).map(|i| (basis(i), forecast(basis(i), 40))).collect();
        group.throughput(Throughput::Elements((issuances * 40) as u64));

        group.bench_with_input(BenchmarkId::new("irregular", issuances), &inputs, |b, inputs| {
            b.iter(|| {
                let series = inputs
                    .iter()
                    .fold(TimeSeriesBuilder::new(), |b, (t, events)| {
                        b.add_series(*t, events.iter().cloned())
                    })
                    .build();
                black_box(series)
            });
        });

        group.bench_with_input(BenchmarkId::new("regular", issuances), &inputs, |b, inputs| {
            b.iter(|| {
                let series = inputs
                    .iter()
                    .fold(
                        RegularTimeSeriesBuilder::new().with_time_step(Duration::hours(STEP_HOURS)),
                        |b, (t, events)| b.add_series(*t, events.iter().cloned()),
                    )
                    .build();
                black_box(series)
            });
        });
    }

    group.finish();
}

// =============================================================================
// Iteration Benchmarks
// =============================================================================

fn bench_views(c: &mut Criterion) {
    let mut group = c.benchmark_group("views");

    for issuances in [10, 100, 1000] {
        let series = create_regular(issuances, 40);
        group.throughput(Throughput::Elements(series.event_count() as u64));

        group.bench_with_input(BenchmarkId::new("time_iter", issuances), &series, |b, s| {
            b.iter(|| black_box(s.time_iter().map(|e| e.value().left()).sum::<f64>()));
        });

        group.bench_with_input(BenchmarkId::new("basis_time_iter", issuances), &series, |b, s| {
            b.iter(|| black_box(s.basis_time_iter().map(|sub| sub.event_count()).sum::<usize>()));
        });

        group.bench_with_input(BenchmarkId::new("duration_iter", issuances), &series, |b, s| {
            b.iter(|| black_box(s.duration_iter().map(|sub| sub.event_count()).sum::<usize>()));
        });
    }

    group.finish();
}

fn bench_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("filters");
    let series = create_regular(500, 40);
    let cutoff = basis(250);
    group.throughput(Throughput::Elements(series.event_count() as u64));

    group.bench_function("filter_by_basis_time", |b| {
        b.iter(|| black_box(series.filter_by_basis_time(|t| t >= cutoff)));
    });

    group.bench_function("filter_by_duration", |b| {
        b.iter(|| black_box(series.filter_by_duration(|d| d <= Duration::hours(120))));
    });

    group.finish();
}

fn bench_ensemble_traces(c: &mut Criterion) {
    let mut group = c.benchmark_group("ensemble_traces");

    for members in [10, 40] {
        let series = create_ensemble(50, 40, members);
        group.throughput(Throughput::Elements((series.event_count() * members) as u64));

        group.bench_with_input(BenchmarkId::from_parameter(members), &series, |b, s| {
            b.iter(|| black_box(s.ensemble_trace_iter().map(|t| t.event_count()).sum::<usize>()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_views, bench_filters, bench_ensemble_traces);
criterion_main!(benches);
