//! Per-shape accumulation and one-shot resolution

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use dashmap::DashMap;
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::pending::{PendingOutput, Unsettled};
use crate::error::AggregationError;
use crate::metrics;
use crate::output::{
    BoxPlotOutput, CellOutputs, DoubleScoreOutput, DurationScoreOutput, MatrixOutput, MetricOutput,
    MetricOutputKey, MetricOutputMultiMap, MultiVectorOutput, OutputGroup, PairedOutput,
};

/// Resolved store of one shape, `None` when the shape has no output
pub(crate) type Resolution<T> = Result<Option<Arc<MetricOutputMultiMap<T>>>, AggregationError>;

/// Join over the drained cells, polled by whichever caller is awaiting it
type Resolving<T> = Shared<BoxFuture<'static, Resolution<T>>>;

/// Pending cells of one output shape
///
/// Registration appends to a sharded map, so producers never contend on a global lock.
/// The first resolution drains the map into a single shared join. Callers that stop
/// waiting leave the join in place for the next caller, and the finished outcome is
/// cached.
pub struct ShapeGroup<T> {
    pending: DashMap<MetricOutputKey, Vec<PendingOutput<T>>>,
    cells: AtomicUsize,
    /// Cells counted in the pending-cells gauge and not yet released
    gauged: Arc<AtomicUsize>,
    permits: Arc<Semaphore>,
    resolution: OnceLock<Resolving<T>>,
}

impl<T> fmt::Debug for ShapeGroup<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeGroup")
            .field("cells", &self.cells.load(Ordering::Acquire))
            .field("keys", &self.pending.len())
            .field("resolving", &self.resolution.get().is_some())
            .finish()
    }
}

impl<T> Drop for ShapeGroup<T> {
    fn drop(&mut self) {
        metrics::release_pending_cells(self.gauged.swap(0, Ordering::AcqRel));
    }
}

impl<T: MetricOutput> ShapeGroup<T> {
    fn new(max_concurrent_cells: usize) -> Self {
        Self {
            pending: DashMap::new(),
            cells: AtomicUsize::new(0),
            gauged: Arc::new(AtomicUsize::new(0)),
            permits: Arc::new(Semaphore::new(max_concurrent_cells)),
            resolution: OnceLock::new(),
        }
    }

    /// Append a pending result under its key
    pub(crate) fn register(&self, key: MetricOutputKey, pending: PendingOutput<T>, collect_metrics: bool) {
        let kind = pending.kind();
        debug!(group = T::GROUP.as_str(), key = %key, kind = kind, "Registering cell");

        self.pending.entry(key).or_default().push(pending);
        self.cells.fetch_add(1, Ordering::Release);

        if collect_metrics {
            self.gauged.fetch_add(1, Ordering::AcqRel);
            metrics::record_cell_registered(T::GROUP, kind);
        }
    }

    /// Number of registered pending results
    pub(crate) fn cell_count(&self) -> usize {
        self.cells.load(Ordering::Acquire)
    }

    /// Work queue bounding spawned computations of this shape
    pub(crate) fn permits(&self) -> Arc<Semaphore> {
        Arc::clone(&self.permits)
    }

    /// Resolve once and share the outcome with every caller
    pub(crate) async fn resolve(&self, collect_metrics: bool) -> Resolution<T> {
        // Draining and starting the join never await, so no caller can interrupt them
        let resolving = self
            .resolution
            .get_or_init(|| {
                settle::<T>(
                    self.drain(),
                    self.cell_count(),
                    Arc::clone(&self.gauged),
                    collect_metrics,
                )
                .boxed()
                .shared()
            })
            .clone();
        resolving.await
    }

    fn drain(&self) -> BTreeMap<MetricOutputKey, Vec<PendingOutput<T>>> {
        let keys: Vec<MetricOutputKey> = self.pending.iter().map(|entry| entry.key().clone()).collect();
        keys.into_iter()
            .filter_map(|key| self.pending.remove(&key))
            .collect()
    }
}

async fn settle<T: MetricOutput>(
    cells: BTreeMap<MetricOutputKey, Vec<PendingOutput<T>>>,
    cell_count: usize,
    gauged: Arc<AtomicUsize>,
    collect_metrics: bool,
) -> Resolution<T> {
    let start = Instant::now();

    let resolution = join_cells(cells).await;

    let elapsed = start.elapsed();
    match &resolution {
        Ok(Some(store)) => info!(
            group = T::GROUP.as_str(),
            cells = cell_count,
            metrics = store.len(),
            duration_ms = elapsed.as_millis() as u64,
            "Resolved output group"
        ),
        Ok(None) => debug!(group = T::GROUP.as_str(), "Output group has no output"),
        Err(e) => warn!(group = T::GROUP.as_str(), error = %e, "Failed to resolve output group"),
    }
    if collect_metrics {
        metrics::record_resolution(T::GROUP, elapsed.as_secs_f64(), resolution.is_ok());
    }
    metrics::release_pending_cells(gauged.swap(0, Ordering::AcqRel));

    resolution
}

/// Await every pending result of every key, then merge per key in key order
async fn join_cells<T: MetricOutput>(
    cells: BTreeMap<MetricOutputKey, Vec<PendingOutput<T>>>,
) -> Resolution<T> {
    if cells.is_empty() {
        return Ok(None);
    }

    let settled = join_all(cells.into_iter().map(|(key, pending)| async move {
        let outcomes = join_all(pending.into_iter().map(PendingOutput::settle)).await;
        (key, outcomes)
    }))
    .await;

    let mut builder = MetricOutputMultiMap::builder();
    let mut outputs = 0;
    for (key, outcomes) in settled {
        let mut merged = CellOutputs::new();
        for outcome in outcomes {
            match outcome {
                Ok(cell) => merged.merge(cell),
                Err(Unsettled::Failed(reason)) => {
                    return Err(AggregationError::CellFailed {
                        group: T::GROUP,
                        key,
                        reason,
                    });
                },
                Err(Unsettled::Interrupted(reason)) => {
                    return Err(AggregationError::Interrupted {
                        group: T::GROUP,
                        key,
                        reason,
                    });
                },
            }
        }
        outputs += merged.len();
        builder.add_cell(&key, merged);
    }

    if outputs == 0 {
        return Ok(None);
    }
    builder
        .build()
        .map(|store| Some(Arc::new(store)))
        .map_err(|e| AggregationError::Inconsistent {
            group: T::GROUP,
            reason: e.to_string(),
        })
}

/// One accumulation per output shape
#[doc(hidden)]
#[derive(Debug)]
pub struct Shapes {
    pub(crate) double_score: ShapeGroup<DoubleScoreOutput>,
    pub(crate) duration_score: ShapeGroup<DurationScoreOutput>,
    pub(crate) multi_vector: ShapeGroup<MultiVectorOutput>,
    pub(crate) matrix: ShapeGroup<MatrixOutput>,
    pub(crate) box_plot: ShapeGroup<BoxPlotOutput>,
    pub(crate) paired: ShapeGroup<PairedOutput>,
}

impl Shapes {
    pub(crate) fn new(max_concurrent_cells: usize) -> Self {
        Self {
            double_score: ShapeGroup::new(max_concurrent_cells),
            duration_score: ShapeGroup::new(max_concurrent_cells),
            multi_vector: ShapeGroup::new(max_concurrent_cells),
            matrix: ShapeGroup::new(max_concurrent_cells),
            box_plot: ShapeGroup::new(max_concurrent_cells),
            paired: ShapeGroup::new(max_concurrent_cells),
        }
    }

    pub(crate) fn cell_count(&self, group: OutputGroup) -> usize {
        match group {
            OutputGroup::DoubleScore => self.double_score.cell_count(),
            OutputGroup::DurationScore => self.duration_score.cell_count(),
            OutputGroup::MultiVector => self.multi_vector.cell_count(),
            OutputGroup::Matrix => self.matrix.cell_count(),
            OutputGroup::BoxPlot => self.box_plot.cell_count(),
            OutputGroup::Paired => self.paired.cell_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::MetricComputeError;
    use crate::output::{MetricId, OutputMetadata};
    use crate::threshold::Threshold;
    use crate::time::TimeWindow;
    use chrono::Duration;

    fn key(hours: i64) -> MetricOutputKey {
        MetricOutputKey::new(
            TimeWindow::of_leads(Duration::hours(hours), Duration::hours(hours)).unwrap(),
            Threshold::all_data(),
        )
    }

    fn cell(metric: MetricId, value: f64) -> CellOutputs<DoubleScoreOutput> {
        [(metric, DoubleScoreOutput::new(value, OutputMetadata::builder(metric).build()))]
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn test_resolution_is_cached() {
        let group = ShapeGroup::<DoubleScoreOutput>::new(2);
        group.register(key(1), cell(MetricId::MeanError, 1.0).into(), false);
        assert_eq!(group.cell_count(), 1);

        let first = group.resolve(false).await.unwrap().unwrap();
        let second = group.resolve(false).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_first_failure_in_key_order() {
        let group = ShapeGroup::<DoubleScoreOutput>::new(2);
        group.register(key(3), PendingOutput::Ready(Err(MetricComputeError::new("late"))), false);
        group.register(key(2), PendingOutput::Ready(Err(MetricComputeError::new("early"))), false);
        group.register(key(1), cell(MetricId::MeanError, 1.0).into(), false);

        let err = group.resolve(false).await.unwrap_err();
        assert_eq!(err.key(), Some(&key(2)));
        assert_eq!(err.group(), OutputGroup::DoubleScore);
        assert!(err.to_string().contains("early"));

        // Cached failure
        assert!(group.resolve(false).await.is_err());
    }

    #[tokio::test]
    async fn test_abandoned_resolution_keeps_cells() {
        let group = ShapeGroup::<DoubleScoreOutput>::new(1);
        let (tx, rx) = tokio::sync::oneshot::channel();
        group.register(key(1), PendingOutput::Channel(rx), false);

        let waited = tokio::time::timeout(std::time::Duration::from_millis(20), group.resolve(false)).await;
        assert!(waited.is_err());

        tx.send(Ok(cell(MetricId::MeanError, 4.0))).unwrap();
        let store = group.resolve(false).await.unwrap().unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_gauge_released_after_resolution() {
        let group = ShapeGroup::<DoubleScoreOutput>::new(1);
        group.register(key(1), cell(MetricId::MeanError, 1.0).into(), true);
        group.register(key(2), cell(MetricId::MeanError, 2.0).into(), true);
        group.register(key(3), cell(MetricId::MeanError, 3.0).into(), false);
        assert_eq!(group.gauged.load(Ordering::Acquire), 2);

        group.resolve(true).await.unwrap();
        assert_eq!(group.gauged.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_gauge_released_when_never_resolved() {
        let group = ShapeGroup::<DoubleScoreOutput>::new(1);
        group.register(key(1), cell(MetricId::MeanError, 1.0).into(), true);
        let gauged = Arc::clone(&group.gauged);
        assert_eq!(gauged.load(Ordering::Acquire), 1);

        drop(group);
        assert_eq!(gauged.load(Ordering::Acquire), 0);
    }

    #[tokio::test]
    async fn test_empty_shape_resolves_to_none() {
        let group = ShapeGroup::<DoubleScoreOutput>::new(1);
        assert!(group.resolve(false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inconsistent_cell_outputs() {
        let group = ShapeGroup::<DoubleScoreOutput>::new(1);
        // Output filed under the wrong metric key
        let mut mixed = cell(MetricId::MeanError, 1.0);
        mixed.insert(
            MetricId::MeanError,
            DoubleScoreOutput::new(2.0, OutputMetadata::builder(MetricId::BiasFraction).build()),
        );
        group.register(key(1), mixed.into(), false);
        group.register(key(2), cell(MetricId::MeanError, 1.0).into(), false);

        let err = group.resolve(false).await.unwrap_err();
        assert!(matches!(err, AggregationError::Inconsistent { .. }));
    }
}
