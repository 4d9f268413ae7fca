use std::fmt;

use super::ids::{MetricComponent, MetricId};
use crate::threshold::Threshold;
use crate::time::TimeWindow;

/// Coordinate of one evaluation cell
///
/// Ordered by time window, then threshold.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricOutputKey {
    window: TimeWindow,
    threshold: Threshold,
}

impl MetricOutputKey {
    /// Key for a window and threshold
    pub fn new(window: TimeWindow, threshold: Threshold) -> Self {
        Self { window, threshold }
    }

    /// The time window
    pub fn time_window(&self) -> &TimeWindow {
        &self.window
    }

    /// The threshold
    pub fn threshold(&self) -> &Threshold {
        &self.threshold
    }
}

impl fmt::Display for MetricOutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.window, self.threshold)
    }
}

/// Metric identifier plus optional component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricKey {
    metric: MetricId,
    component: Option<MetricComponent>,
}

impl MetricKey {
    /// Key of a metric without components
    pub fn new(metric: MetricId) -> Self {
        Self {
            metric,
            component: None,
        }
    }

    /// Key of one component of a metric
    pub fn with_component(metric: MetricId, component: MetricComponent) -> Self {
        Self {
            metric,
            component: Some(component),
        }
    }

    /// The metric
    pub fn metric(&self) -> MetricId {
        self.metric
    }

    /// The component
    pub fn component(&self) -> Option<MetricComponent> {
        self.component
    }
}

impl From<MetricId> for MetricKey {
    fn from(metric: MetricId) -> Self {
        Self::new(metric)
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.component {
            Some(component) => write!(f, "{}/{}", self.metric, component),
            None => write!(f, "{}", self.metric),
        }
    }
}
