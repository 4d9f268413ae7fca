//! Metadata describing a verification sample
//!
//! [`SampleMetadata`] travels with every time-series. Merging series unions their
//! metadata: the unit and dataset identity must agree, time windows are widened to
//! cover every input and thresholds are dropped.

use std::fmt;
use std::sync::Arc;

use crate::error::DataError;
use crate::threshold::Threshold;
use crate::time::TimeWindow;

/// Unit of measurement
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeasurementUnit(Arc<str>);

impl MeasurementUnit {
    /// Unit used when none is declared
    pub const DIMENSIONLESS: &'static str = "DIMENSIONLESS";

    /// Create a unit
    pub fn new(unit: impl Into<Arc<str>>) -> Self {
        Self(unit.into())
    }

    /// Unit name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MeasurementUnit {
    fn default() -> Self {
        Self::new(Self::DIMENSIONLESS)
    }
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the dataset a sample was drawn from
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetIdentifier {
    feature: Option<Arc<str>>,
    variable: Option<Arc<str>>,
    scenario: Option<Arc<str>>,
    baseline_scenario: Option<Arc<str>>,
}

impl DatasetIdentifier {
    /// Identity with a feature, a variable and a scenario
    pub fn new(
        feature: impl Into<Arc<str>>,
        variable: impl Into<Arc<str>>,
        scenario: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            feature: Some(feature.into()),
            variable: Some(variable.into()),
            scenario: Some(scenario.into()),
            baseline_scenario: None,
        }
    }

    /// Copy of this identity with a baseline scenario
    pub fn with_baseline_scenario(mut self, scenario: impl Into<Arc<str>>) -> Self {
        self.baseline_scenario = Some(scenario.into());
        self
    }

    /// Geographic feature name
    pub fn feature(&self) -> Option<&str> {
        self.feature.as_deref()
    }

    /// Variable name
    pub fn variable(&self) -> Option<&str> {
        self.variable.as_deref()
    }

    /// Scenario name
    pub fn scenario(&self) -> Option<&str> {
        self.scenario.as_deref()
    }

    /// Baseline scenario name
    pub fn baseline_scenario(&self) -> Option<&str> {
        self.baseline_scenario.as_deref()
    }
}

impl fmt::Display for DatasetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            &self.feature,
            &self.variable,
            &self.scenario,
            &self.baseline_scenario,
        ];
        let mut first = true;
        for part in parts.into_iter().flatten() {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(part)?;
            first = false;
        }
        Ok(())
    }
}

/// Metadata of a verification sample
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SampleMetadata {
    unit: MeasurementUnit,
    identifier: Option<DatasetIdentifier>,
    time_window: Option<TimeWindow>,
    threshold: Option<Threshold>,
}

impl SampleMetadata {
    /// Metadata with a unit only
    pub fn of(unit: MeasurementUnit) -> Self {
        Self {
            unit,
            ..Self::default()
        }
    }

    /// Start a builder
    pub fn builder() -> SampleMetadataBuilder {
        SampleMetadataBuilder::default()
    }

    /// Measurement unit of the sample
    pub fn unit(&self) -> &MeasurementUnit {
        &self.unit
    }

    /// Dataset identity
    pub fn identifier(&self) -> Option<&DatasetIdentifier> {
        self.identifier.as_ref()
    }

    /// Time window the sample covers
    pub fn time_window(&self) -> Option<&TimeWindow> {
        self.time_window.as_ref()
    }

    /// Threshold the sample was conditioned on
    pub fn threshold(&self) -> Option<&Threshold> {
        self.threshold.as_ref()
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

    /// Equal apart from the time window and threshold
    pub fn equals_ignoring_window_and_threshold(&self, other: &SampleMetadata) -> bool {
        self.unit == other.unit && self.identifier == other.identifier
    }

    /// Union of several metadata
    ///
    /// Every input must share the unit and dataset identity of the first. Windows are
    /// unioned when present; thresholds are not carried into the union.
    ///
    /// # Errors
    ///
    /// `DataError::Empty` for no input, `DataError::MetadataMismatch` when units or
    /// identities differ.
    pub fn union_of<'a>(
        metadata: impl IntoIterator<Item = &'a SampleMetadata>,
    ) -> Result<Self, DataError> {
        let mut metadata = metadata.into_iter();
        let first = metadata
            .next()
            .ok_or_else(|| DataError::Empty("cannot find the union of empty metadata".to_string()))?;

        let mut windows: Vec<TimeWindow> = first.time_window.into_iter().collect();
        for next in metadata {
            if !next.equals_ignoring_window_and_threshold(first) {
                return Err(DataError::MetadataMismatch(format!(
                    "only the time window and threshold can differ when finding the union of metadata: \
                     expected unit {} and identity {:?}, found unit {} and identity {:?}",
                    first.unit, first.identifier, next.unit, next.identifier
                )));
            }
            windows.extend(next.time_window);
        }

        let time_window = if windows.is_empty() {
            None
        } else {
            Some(TimeWindow::union_of(&windows)?)
        };

        Ok(Self {
            unit: first.unit.clone(),
            identifier: first.identifier.clone(),
            time_window,
            threshold: None,
        })
    }
}

impl fmt::Display for SampleMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.unit)?;
        if let Some(identifier) = &self.identifier {
            write!(f, ",{}", identifier)?;
        }
        if let Some(window) = &self.time_window {
            write!(f, ",{}", window)?;
        }
        if let Some(threshold) = &self.threshold {
            write!(f, ",{}", threshold)?;
        }
        f.write_str("]")
    }
}

/// Builder for [`SampleMetadata`]
#[derive(Debug, Clone, Default)]
pub struct SampleMetadataBuilder {
    metadata: SampleMetadata,
}

impl SampleMetadataBuilder {
    /// Set the measurement unit
    pub fn unit(mut self, unit: MeasurementUnit) -> Self {
        self.metadata.unit = unit;
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
    pub fn build(self) -> SampleMetadata {
        self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::Operator;
    use chrono::Duration;

    fn streamflow() -> DatasetIdentifier {
        DatasetIdentifier::new("DRRC2", "STREAMFLOW", "HEFS")
    }

    #[test]
    fn test_default_unit_is_dimensionless() {
        assert_eq!(SampleMetadata::default().unit().as_str(), "DIMENSIONLESS");
    }

    #[test]
    fn test_union_widens_windows_and_drops_threshold() {
        let a = SampleMetadata::builder()
            .unit(MeasurementUnit::new("CMS"))
            .identifier(streamflow())
            .time_window(TimeWindow::of_leads(Duration::hours(1), Duration::hours(2)).unwrap())
            .threshold(Threshold::value(Operator::Greater, 1.0).unwrap())
            .build();
        let b = a.with_time_window(TimeWindow::of_leads(Duration::hours(4), Duration::hours(8)).unwrap());
        let c = SampleMetadata::builder()
            .unit(MeasurementUnit::new("CMS"))
            .identifier(streamflow())
            .build();

        let union = SampleMetadata::union_of([&a, &b, &c]).unwrap();
        let window = union.time_window().unwrap();
        assert_eq!(window.earliest_lead(), Duration::hours(1));
        assert_eq!(window.latest_lead(), Duration::hours(8));
        assert!(union.threshold().is_none());
    }

    #[test]
    fn test_union_rejects_different_units() {
        let a = SampleMetadata::of(MeasurementUnit::new("CMS"));
        let b = SampleMetadata::of(MeasurementUnit::new("CFS"));
        assert!(matches!(
            SampleMetadata::union_of([&a, &b]),
            Err(DataError::MetadataMismatch(_))
        ));
    }

    #[test]
    fn test_union_rejects_different_identity() {
        let a = SampleMetadata::builder().identifier(streamflow()).build();
        let b = SampleMetadata::builder()
            .identifier(streamflow().with_baseline_scenario("ESP"))
            .build();
        assert!(SampleMetadata::union_of([&a, &b]).is_err());
        assert!(SampleMetadata::union_of(std::iter::empty()).is_err());
    }

    #[test]
    fn test_identifier_display() {
        assert_eq!(streamflow().to_string(), "DRRC2,STREAMFLOW,HEFS");
    }
}
