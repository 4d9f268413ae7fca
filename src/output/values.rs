//! The closed set of metric output shapes

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::Duration;

use super::ids::{MetricDimension, OutputGroup};
use super::metadata::OutputMetadata;
use crate::aggregation::{ShapeGroup, Shapes};
use crate::error::DataError;
use crate::types::Timestamp;

mod sealed {
    pub trait Sealed {}
}

/// A computed metric value of one output shape
///
/// Implemented only by the six shapes of this module.
pub trait MetricOutput: sealed::Sealed + Clone + fmt::Debug + Send + Sync + 'static {
    /// Shape group the output belongs to
    const GROUP: OutputGroup;

    /// Metadata of the output
    fn metadata(&self) -> &OutputMetadata;

    #[doc(hidden)]
    fn shape(shapes: &Shapes) -> &ShapeGroup<Self>;
}

macro_rules! metric_output {
    ($ty:ty, $group:expr, $field:ident) => {
        impl sealed::Sealed for $ty {}

        impl MetricOutput for $ty {
            const GROUP: OutputGroup = $group;

            fn metadata(&self) -> &OutputMetadata {
                &self.metadata
            }

            fn shape(shapes: &Shapes) -> &ShapeGroup<Self> {
                &shapes.$field
            }
        }
    };
}

/// A real-valued score
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleScoreOutput {
    value: f64,
    metadata: OutputMetadata,
}

impl DoubleScoreOutput {
    /// Wrap a score
    pub fn new(value: f64, metadata: OutputMetadata) -> Self {
        Self { value, metadata }
    }

    /// The score
    pub fn value(&self) -> f64 {
        self.value
    }
}

metric_output!(DoubleScoreOutput, OutputGroup::DoubleScore, double_score);

/// A score expressed as a duration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationScoreOutput {
    value: Duration,
    metadata: OutputMetadata,
}

impl DurationScoreOutput {
    /// Wrap a duration score
    pub fn new(value: Duration, metadata: OutputMetadata) -> Self {
        Self { value, metadata }
    }

    /// The score
    pub fn value(&self) -> Duration {
        self.value
    }
}

metric_output!(DurationScoreOutput, OutputGroup::DurationScore, duration_score);

/// Named vectors of equal length, e.g. the axes of a diagram
#[derive(Debug, Clone, PartialEq)]
pub struct MultiVectorOutput {
    vectors: Arc<BTreeMap<MetricDimension, Arc<[f64]>>>,
    metadata: OutputMetadata,
}

impl MultiVectorOutput {
    /// Build from named vectors
    ///
    /// Fails when no vector is given or the vectors differ in length.
    pub fn new(
        vectors: impl IntoIterator<Item = (MetricDimension, Vec<f64>)>,
        metadata: OutputMetadata,
    ) -> Result<Self, DataError> {
        let vectors: BTreeMap<MetricDimension, Arc<[f64]>> = vectors
            .into_iter()
            .map(|(dimension, values)| (dimension, Arc::from(values)))
            .collect();

        let mut lengths = vectors.values().map(|v| v.len());
        let first = lengths
            .next()
            .ok_or_else(|| DataError::Empty("a multi-vector output needs at least one vector".into()))?;
        if lengths.any(|len| len != first) {
            return Err(DataError::MetadataMismatch(
                "the vectors of a multi-vector output must have the same length".into(),
            ));
        }

        Ok(Self {
            vectors: Arc::new(vectors),
            metadata,
        })
    }

    /// Vector for one dimension
    pub fn get(&self, dimension: MetricDimension) -> Option<&[f64]> {
        self.vectors.get(&dimension).map(|v| &v[..])
    }

    /// Dimensions present, in order
    pub fn dimensions(&self) -> impl Iterator<Item = MetricDimension> + '_ {
        self.vectors.keys().copied()
    }

    /// Length shared by every vector
    pub fn vector_len(&self) -> usize {
        self.vectors.values().next().map_or(0, |v| v.len())
    }
}

metric_output!(MultiVectorOutput, OutputGroup::MultiVector, multi_vector);

/// A dense row-major matrix, e.g. a contingency table
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixOutput {
    rows: usize,
    columns: usize,
    values: Arc<[f64]>,
    names: Option<Arc<[MetricDimension]>>,
    metadata: OutputMetadata,
}

impl MatrixOutput {
    /// Build from rows
    ///
    /// Fails when there is no row, no column or the rows differ in length.
    pub fn new(rows: Vec<Vec<f64>>, metadata: OutputMetadata) -> Result<Self, DataError> {
        let columns = rows.first().map_or(0, Vec::len);
        if columns == 0 {
            return Err(DataError::Empty("a matrix output needs at least one cell".into()));
        }
        if rows.iter().any(|row| row.len() != columns) {
            return Err(DataError::MetadataMismatch(
                "the rows of a matrix output must have the same length".into(),
            ));
        }
        Ok(Self {
            rows: rows.len(),
            columns,
            values: rows.into_iter().flatten().collect(),
            names: None,
            metadata,
        })
    }

    /// Name the cells, row-major
    pub fn with_names(mut self, names: Vec<MetricDimension>) -> Result<Self, DataError> {
        if names.len() != self.values.len() {
            return Err(DataError::MetadataMismatch(format!(
                "expected {} cell names, found {}",
                self.values.len(),
                names.len()
            )));
        }
        self.names = Some(names.into());
        Ok(self)
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// One cell
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        Some(self.values[row * self.columns + column])
    }

    /// One row
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        let start = row.checked_mul(self.columns)?;
        self.values.get(start..start + self.columns)
    }

    /// Cell names, row-major
    pub fn names(&self) -> Option<&[MetricDimension]> {
        self.names.as_deref()
    }
}

metric_output!(MatrixOutput, OutputGroup::Matrix, matrix);

/// Quantiles of one box, linked to a domain value
#[derive(Debug, Clone, PartialEq)]
pub struct BoxPlot {
    linked_value: f64,
    quantiles: Arc<[f64]>,
}

impl BoxPlot {
    /// One box
    pub fn new(linked_value: f64, quantiles: Vec<f64>) -> Self {
        Self {
            linked_value,
            quantiles: quantiles.into(),
        }
    }

    /// Domain value the box belongs to
    pub fn linked_value(&self) -> f64 {
        self.linked_value
    }

    /// Quantiles at the probabilities of the enclosing output
    pub fn quantiles(&self) -> &[f64] {
        &self.quantiles
    }
}

/// Box plots sharing one set of probabilities
#[derive(Debug, Clone, PartialEq)]
pub struct BoxPlotOutput {
    boxes: Arc<[BoxPlot]>,
    probabilities: Arc<[f64]>,
    domain: MetricDimension,
    range: MetricDimension,
    metadata: OutputMetadata,
}

impl BoxPlotOutput {
    /// Build box plots
    ///
    /// The probabilities must be strictly ascending in `[0, 1]`, and every box must hold
    /// one non-decreasing quantile per probability.
    pub fn new(
        boxes: Vec<BoxPlot>,
        probabilities: Vec<f64>,
        domain: MetricDimension,
        range: MetricDimension,
        metadata: OutputMetadata,
    ) -> Result<Self, DataError> {
        if probabilities.is_empty() {
            return Err(DataError::Empty("box plots need at least one probability".into()));
        }
        if probabilities.iter().any(|p| !(0.0..=1.0).contains(p))
            || probabilities.windows(2).any(|w| w[0] >= w[1])
        {
            return Err(DataError::InvalidThreshold(format!(
                "box plot probabilities must be strictly ascending in [0, 1]: {:?}",
                probabilities
            )));
        }
        for b in &boxes {
            if b.quantiles.len() != probabilities.len() {
                return Err(DataError::MetadataMismatch(format!(
                    "box at {} has {} quantiles, expected {}",
                    b.linked_value,
                    b.quantiles.len(),
                    probabilities.len()
                )));
            }
            if b.quantiles.windows(2).any(|w| w[0] > w[1]) {
                return Err(DataError::MetadataMismatch(format!(
                    "quantiles of the box at {} are not sorted",
                    b.linked_value
                )));
            }
        }
        Ok(Self {
            boxes: boxes.into(),
            probabilities: probabilities.into(),
            domain,
            range,
            metadata,
        })
    }

    /// The boxes
    pub fn boxes(&self) -> &[BoxPlot] {
        &self.boxes
    }

    /// Probabilities of the quantiles
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Dimension of the linked values
    pub fn domain(&self) -> MetricDimension {
        self.domain
    }

    /// Dimension of the quantiles
    pub fn range(&self) -> MetricDimension {
        self.range
    }
}

metric_output!(BoxPlotOutput, OutputGroup::BoxPlot, box_plot);

/// Instants paired with durations, e.g. timing error per issuance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedOutput {
    pairs: Arc<[(Timestamp, Duration)]>,
    metadata: OutputMetadata,
}

impl PairedOutput {
    /// Wrap the pairs
    pub fn new(pairs: Vec<(Timestamp, Duration)>, metadata: OutputMetadata) -> Self {
        Self {
            pairs: pairs.into(),
            metadata,
        }
    }

    /// The pairs
    pub fn pairs(&self) -> &[(Timestamp, Duration)] {
        &self.pairs
    }
}

metric_output!(PairedOutput, OutputGroup::Paired, paired);
