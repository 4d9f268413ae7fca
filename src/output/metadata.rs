use std::fmt;

use super::ids::{MetricComponent, MetricId};
use crate::metadata::{DatasetIdentifier, MeasurementUnit};
use crate::threshold::Threshold;
use crate::time::TimeWindow;

/// Metadata attached to every metric output
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputMetadata {
    sample_size: usize,
    unit: MeasurementUnit,
    input_unit: MeasurementUnit,
    metric: MetricId,
    component: Option<MetricComponent>,
    identifier: Option<DatasetIdentifier>,
    time_window: Option<TimeWindow>,
    threshold: Option<Threshold>,
}

impl OutputMetadata {
    /// Start a builder for the given metric
    ///
    /// Units default to dimensionless, the sample size to zero.
    pub fn builder(metric: MetricId) -> OutputMetadataBuilder {
        OutputMetadataBuilder {
            metadata: OutputMetadata {
                sample_size: 0,
                unit: MeasurementUnit::default(),
                input_unit: MeasurementUnit::default(),
                metric,
                component: None,
                identifier: None,
                time_window: None,
                threshold: None,
            },
        }
    }

    /// Number of pairs the output was computed from
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Unit of the output
    pub fn unit(&self) -> &MeasurementUnit {
        &self.unit
    }

    /// Unit of the pairs the output was computed from
    pub fn input_unit(&self) -> &MeasurementUnit {
        &self.input_unit
    }

    /// Metric that produced the output
    pub fn metric(&self) -> MetricId {
        self.metric
    }

    /// Metric component, for decomposed scores
    pub fn component(&self) -> Option<MetricComponent> {
        self.component
    }

    /// Dataset identity
    pub fn identifier(&self) -> Option<&DatasetIdentifier> {
        self.identifier.as_ref()
    }

    /// Time window of the pairs
    pub fn time_window(&self) -> Option<&TimeWindow> {
        self.time_window.as_ref()
    }

    /// Threshold the pairs were conditioned on
    pub fn threshold(&self) -> Option<&Threshold> {
        self.threshold.as_ref()
    }

    /// Same metric, component, output unit and input unit
    ///
    /// Outputs stored together in one keyed store must be minimally equal.
    pub fn minimally_equals(&self, other: &OutputMetadata) -> bool {
        self.metric == other.metric
            && self.component == other.component
            && self.unit == other.unit
            && self.input_unit == other.input_unit
    }

    /// Copy with a different time window
    pub fn with_time_window(&self, window: TimeWindow) -> Self {
        Self {
            time_window: Some(window),
            ..self.clone()
        }
    }

    /// Copy with a different threshold
    pub fn with_threshold(&self, threshold: Threshold) -> Self {
        Self {
            threshold: Some(threshold),
            ..self.clone()
        }
    }
}

impl fmt::Display for OutputMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.metric)?;
        if let Some(component) = self.component {
            write!(f, ",{}", component)?;
        }
        write!(
            f,
            ",{},{},{}",
            self.unit, self.input_unit, self.sample_size
        )?;
        if let Some(window) = &self.time_window {
            write!(f, ",{}", window)?;
        }
        f.write_str("]")
    }
}

/// Builder for [`OutputMetadata`]
#[derive(Debug, Clone)]
pub struct OutputMetadataBuilder {
    metadata: OutputMetadata,
}

impl OutputMetadataBuilder {
    /// Set the sample size
    pub fn sample_size(mut self, sample_size: usize) -> Self {
        self.metadata.sample_size = sample_size;
        self
    }

    /// Set the output unit
    pub fn unit(mut self, unit: MeasurementUnit) -> Self {
        self.metadata.unit = unit;
        self
    }

    /// Set the input unit
    pub fn input_unit(mut self, unit: MeasurementUnit) -> Self {
        self.metadata.input_unit = unit;
        self
    }

    /// Set the metric component
    pub fn component(mut self, component: MetricComponent) -> Self {
        self.metadata.component = Some(component);
        self
    }

    /// Set the dataset identity
    pub fn identifier(mut self, identifier: DatasetIdentifier) -> Self {
        self.metadata.identifier = Some(identifier);
        self
    }

    /// Set the time window
    pub fn time_window(mut self, window: TimeWindow) -> Self {
        self.metadata.time_window = Some(window);
        self
    }

    /// Set the threshold
    pub fn threshold(mut self, threshold: Threshold) -> Self {
        self.metadata.threshold = Some(threshold);
        self
    }

    /// Build the metadata
    pub fn build(self) -> OutputMetadata {
        self.metadata
    }
}
