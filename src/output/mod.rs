//! Metric outputs and their immutable stores
//!
//! - [`MetricOutput`]: the closed set of output shapes with their [`OutputMetadata`]
//! - [`MetricOutputMap`]: one metric's outputs keyed by [`MetricOutputKey`]
//! - [`MetricOutputMultiMap`]: keyed stores of one shape grouped per [`MetricKey`]

mod ids;
mod key;
mod metadata;
mod multi;
mod store;
mod values;

pub use ids::{MetricComponent, MetricDimension, MetricId, OutputGroup};
pub use key::{MetricKey, MetricOutputKey};
pub use metadata::{OutputMetadata, OutputMetadataBuilder};
pub use multi::{CellOutputs, MetricOutputMultiMap, MetricOutputMultiMapBuilder};
pub use store::{MetricOutputMap, MetricOutputMapBuilder};
pub use values::{
    BoxPlot, BoxPlotOutput, DoubleScoreOutput, DurationScoreOutput, MatrixOutput, MetricOutput,
    MultiVectorOutput, PairedOutput,
};
