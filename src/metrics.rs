//! Prometheus metrics for the verification core
//!
//! Collectors are process-wide and registered lazily in the default registry.
//! Aggregation code only records into them when
//! [`AggregationConfig::collect_metrics`](crate::config::AggregationConfig) is set.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

use crate::output::OutputGroup;

lazy_static! {
    // === Aggregation Counters ===

    /// Cells registered with a project aggregator
    pub static ref CELLS_REGISTERED_TOTAL: CounterVec = register_counter_vec!(
        "hydroverify_cells_registered_total",
        "Total metric cells registered by output group and registration kind",
        &["group", "kind"]
    ).unwrap();

    /// Shape resolutions
    pub static ref RESOLUTIONS_TOTAL: CounterVec = register_counter_vec!(
        "hydroverify_resolutions_total",
        "Total output group resolutions by status",
        &["group", "status"]
    ).unwrap();

    // === Latency Histograms ===

    /// Time spent waiting for every cell of a shape
    pub static ref RESOLUTION_DURATION: HistogramVec = register_histogram_vec!(
        "hydroverify_resolution_duration_seconds",
        "Output group resolution latency in seconds",
        &["group"],
        vec![0.0001, 0.001, 0.01, 0.1, 1.0, 10.0]
    ).unwrap();

    // === Data Model ===

    /// Time-series built
    pub static ref SERIES_BUILT_TOTAL: CounterVec = register_counter_vec!(
        "hydroverify_series_built_total",
        "Total time-series built by kind",
        &["kind"]
    ).unwrap();

    /// Cells currently registered but not yet resolved
    pub static ref PENDING_CELLS: Gauge = register_gauge!(
        "hydroverify_pending_cells",
        "Number of registered cells awaiting resolution"
    ).unwrap();
}

/// Get metrics in Prometheus text format
///
/// # Returns
///
/// Result containing the formatted metrics string, or an error if encoding fails
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Metrics contain invalid UTF-8: {}", e))
}

/// Record a cell registration
#[inline]
pub fn record_cell_registered(group: OutputGroup, kind: &str) {
    CELLS_REGISTERED_TOTAL
        .with_label_values(&[group.as_str(), kind])
        .inc();
    PENDING_CELLS.inc();
}

/// Record the resolution of one output group
#[inline]
pub fn record_resolution(group: OutputGroup, duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    RESOLUTIONS_TOTAL
        .with_label_values(&[group.as_str(), status])
        .inc();

    RESOLUTION_DURATION
        .with_label_values(&[group.as_str()])
        .observe(duration_secs);
}

/// Remove cells from the pending gauge once resolved or abandoned
#[inline]
pub fn release_pending_cells(cells: usize) {
    if cells > 0 {
        PENDING_CELLS.sub(cells as f64);
    }
}

/// Record a time-series construction
#[inline]
pub fn record_series_built(kind: &str) {
    SERIES_BUILT_TOTAL.with_label_values(&[kind]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_cell_registered() {
        record_cell_registered(OutputGroup::DoubleScore, "ready");
        let metrics = gather_metrics().expect("Failed to gather metrics");
        assert!(metrics.contains("hydroverify_cells_registered_total"));
        assert!(metrics.contains("DOUBLE_SCORE"));
    }

    #[test]
    fn test_record_resolution() {
        record_resolution(OutputGroup::Matrix, 0.002, false);
        let metrics = gather_metrics().expect("Failed to gather metrics");
        assert!(metrics.contains("hydroverify_resolutions_total"));
        assert!(metrics.contains("hydroverify_resolution_duration_seconds"));
    }

    #[test]
    fn test_record_series_built() {
        record_series_built("regular");
        assert!(SERIES_BUILT_TOTAL.with_label_values(&["regular"]).get() >= 1.0);
    }
}
