use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use super::pending::{MetricComputeError, PendingOutput};
use super::shape::Shapes;
use crate::config::AggregationConfig;
use crate::error::{Error, Result};
use crate::output::{
    BoxPlotOutput, CellOutputs, DoubleScoreOutput, DurationScoreOutput, MatrixOutput, MetricOutput,
    MetricOutputKey, MetricOutputMultiMap, MultiVectorOutput, OutputGroup, PairedOutput,
};

// ============================================================================
// Accumulation
// ============================================================================

/// Concurrent accumulator of the metric outputs of one project
///
/// Producers share the builder (e.g. behind an `Arc`) and register pending cell
/// results from any thread. Nothing can be read until [`build`](Self::build).
///
/// # Example
///
/// ```rust,ignore
/// let builder = Arc::new(ProjectOutputBuilder::new(&config.aggregation));
/// builder.submit(key, async move { compute_scores(pool).await })?;
///
/// let output = Arc::try_unwrap(builder).expect("producers finished").build();
/// let scores = output.double_scores().await?;
/// ```
pub struct ProjectOutputBuilder {
    shapes: Shapes,
    collect_metrics: bool,
}

impl ProjectOutputBuilder {
    /// Create an empty builder
    ///
    /// Spawned computations of each shape run at most `max_concurrent_cells` at a time.
    pub fn new(config: &AggregationConfig) -> Self {
        debug!(
            max_concurrent_cells = config.max_concurrent_cells,
            collect_metrics = config.collect_metrics,
            "Creating project output builder"
        );
        Self {
            shapes: Shapes::new(config.max_concurrent_cells.max(1)),
            collect_metrics: config.collect_metrics,
        }
    }

    /// Register a pending cell result under its key
    ///
    /// Several results may share a key; all are kept and merged at resolution.
    pub fn add<T: MetricOutput>(&self, key: MetricOutputKey, pending: impl Into<PendingOutput<T>>) {
        T::shape(&self.shapes).register(key, pending.into(), self.collect_metrics);
    }

    /// Spawn a cell computation on the current tokio runtime and register its handle
    ///
    /// The computation waits for a slot in the work queue of its shape before running.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` when called outside a tokio runtime.
    pub fn submit<T, F>(&self, key: MetricOutputKey, computation: F) -> Result<()>
    where
        T: MetricOutput,
        F: Future<Output = std::result::Result<CellOutputs<T>, MetricComputeError>> + Send + 'static,
    {
        let handle = Handle::try_current()
            .map_err(|e| Error::Configuration(format!("submitting a cell requires a tokio runtime: {}", e)))?;

        let permits = T::shape(&self.shapes).permits();
        let task = handle.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| MetricComputeError::new("the work queue was closed"))?;
            computation.await
        });

        self.add::<T>(key, PendingOutput::Task(task));
        Ok(())
    }

    /// Whether any cell was registered for the shape
    pub fn has_output(&self, group: OutputGroup) -> bool {
        self.shapes.cell_count(group) > 0
    }

    /// Number of pending results registered for the shape
    pub fn cell_count(&self, group: OutputGroup) -> usize {
        self.shapes.cell_count(group)
    }

    /// Stop accepting cells
    pub fn build(self) -> ProjectOutput {
        debug!(
            cells = OutputGroup::ALL
                .iter()
                .map(|g| self.shapes.cell_count(*g))
                .sum::<usize>(),
            "Building project output"
        );
        ProjectOutput {
            shapes: self.shapes,
            collect_metrics: self.collect_metrics,
        }
    }
}

impl fmt::Debug for ProjectOutputBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectOutputBuilder")
            .field("shapes", &self.shapes)
            .field("collect_metrics", &self.collect_metrics)
            .finish()
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Metric outputs of one project, resolved per shape on first access
///
/// Each shape is resolved at most once: the first caller starts a join over every
/// pending result of that shape and later callers share the cached store or failure.
/// A caller that stops waiting (timeout, `select!`) leaves the join to the next one.
pub struct ProjectOutput {
    shapes: Shapes,
    collect_metrics: bool,
}

impl ProjectOutput {
    /// Whether any cell was registered for the shape
    pub fn has_output(&self, group: OutputGroup) -> bool {
        self.shapes.cell_count(group) > 0
    }

    /// Shapes with at least one registered cell
    pub fn output_groups(&self) -> BTreeSet<OutputGroup> {
        OutputGroup::ALL
            .into_iter()
            .filter(|g| self.has_output(*g))
            .collect()
    }

    /// Resolve the outputs of one shape
    ///
    /// `None` when the shape has no output.
    ///
    /// # Errors
    ///
    /// Returns `Error::Aggregation` when a cell of the shape failed or its producer
    /// vanished, identifying the first offending key in key order.
    pub async fn output<T: MetricOutput>(&self) -> Result<Option<Arc<MetricOutputMultiMap<T>>>> {
        Ok(T::shape(&self.shapes).resolve(self.collect_metrics).await?)
    }

    /// Real-valued scores
    pub async fn double_scores(&self) -> Result<Option<Arc<MetricOutputMultiMap<DoubleScoreOutput>>>> {
        self.output().await
    }

    /// Duration scores
    pub async fn duration_scores(&self) -> Result<Option<Arc<MetricOutputMultiMap<DurationScoreOutput>>>> {
        self.output().await
    }

    /// Vectors and diagrams
    pub async fn multi_vectors(&self) -> Result<Option<Arc<MetricOutputMultiMap<MultiVectorOutput>>>> {
        self.output().await
    }

    /// Matrices
    pub async fn matrices(&self) -> Result<Option<Arc<MetricOutputMultiMap<MatrixOutput>>>> {
        self.output().await
    }

    /// Box plots
    pub async fn box_plots(&self) -> Result<Option<Arc<MetricOutputMultiMap<BoxPlotOutput>>>> {
        self.output().await
    }

    /// Paired outputs
    pub async fn paired(&self) -> Result<Option<Arc<MetricOutputMultiMap<PairedOutput>>>> {
        self.output().await
    }
}

impl fmt::Debug for ProjectOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectOutput")
            .field("shapes", &self.shapes)
            .finish()
    }
}
