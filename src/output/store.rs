//! Immutable `(time window, threshold)`-keyed store of one metric's outputs

use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::key::MetricOutputKey;
use super::metadata::OutputMetadata;
use super::values::MetricOutput;
use crate::error::{DataError, Error, Result};
use crate::threshold::Threshold;
use crate::time::TimeWindow;

/// Ordered immutable map from cell coordinate to output
///
/// Every output is minimally equal to the store metadata. Cloning shares the entries.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricOutputMap<T> {
    entries: Arc<BTreeMap<MetricOutputKey, T>>,
    metadata: OutputMetadata,
}

impl<T: MetricOutput> MetricOutputMap<T> {
    /// Start a builder
    pub fn builder() -> MetricOutputMapBuilder<T> {
        MetricOutputMapBuilder::default()
    }

    /// Combine stores into one
    ///
    /// The time windows of the store metadata are unioned. Entries are unioned and a key
    /// present in several stores keeps the value of the last store that has it.
    pub fn combine<'a>(stores: impl IntoIterator<Item = &'a MetricOutputMap<T>>) -> Result<Self> {
        let stores: Vec<&MetricOutputMap<T>> = stores.into_iter().collect();
        let first = stores
            .first()
            .ok_or_else(|| DataError::Empty("no stores to combine".into()))?;

        let windows: Vec<&TimeWindow> = stores.iter().filter_map(|s| s.metadata.time_window()).collect();
        let metadata = if windows.is_empty() {
            first.metadata.clone()
        } else {
            first.metadata.with_time_window(TimeWindow::union_of(windows)?)
        };

        let mut builder = MetricOutputMapBuilder::default().with_metadata(metadata);
        for store in &stores {
            for (key, value) in store.iter() {
                builder.insert(key.clone(), value.clone());
            }
        }
        builder.build()
    }

    fn restrict(&self, keep: impl Fn(&MetricOutputKey) -> bool) -> Option<Self> {
        let entries: BTreeMap<MetricOutputKey, T> = self
            .entries
            .iter()
            .filter(|(key, _)| keep(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if entries.is_empty() {
            return None;
        }
        if entries.len() == self.entries.len() {
            return Some(self.clone());
        }
        Some(Self {
            entries: Arc::new(entries),
            metadata: self.metadata.clone(),
        })
    }

    /// Entries at exactly this time window, `None` when there are none
    pub fn slice_by_time_window(&self, window: &TimeWindow) -> Option<Self> {
        self.restrict(|key| key.time_window() == window)
    }

    /// Entries at exactly this threshold, `None` when there are none
    pub fn slice_by_threshold(&self, threshold: &Threshold) -> Option<Self> {
        self.restrict(|key| key.threshold() == threshold)
    }

    /// Entries whose window has the same lead bounds, `None` when there are none
    pub fn slice_by_lead(&self, window: &TimeWindow) -> Option<Self> {
        self.restrict(|key| key.time_window().same_leads(window))
    }
}

impl<T> MetricOutputMap<T> {
    /// Output at a key
    pub fn get(&self, key: &MetricOutputKey) -> Option<&T> {
        self.entries.get(key)
    }

    /// Output at a key, failing when absent
    pub fn value(&self, key: &MetricOutputKey) -> Result<&T> {
        self.entries
            .get(key)
            .ok_or_else(|| Error::NoMatchingData(format!("no output at {}", key)))
    }

    /// Number of entries, never zero
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false, a store holds at least one entry
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> btree_map::Iter<'_, MetricOutputKey, T> {
        self.entries.iter()
    }

    /// Keys in order
    pub fn keys(&self) -> btree_map::Keys<'_, MetricOutputKey, T> {
        self.entries.keys()
    }

    /// Outputs in key order
    pub fn values(&self) -> btree_map::Values<'_, MetricOutputKey, T> {
        self.entries.values()
    }

    /// Store metadata
    pub fn metadata(&self) -> &OutputMetadata {
        &self.metadata
    }

    /// Distinct time windows
    pub fn time_windows(&self) -> BTreeSet<TimeWindow> {
        self.keys().map(|k| *k.time_window()).collect()
    }

    /// Distinct thresholds
    pub fn thresholds(&self) -> BTreeSet<Threshold> {
        self.keys().map(|k| k.threshold().clone()).collect()
    }

    /// Distinct lead bounds of the time windows
    pub fn lead_windows(&self) -> BTreeSet<TimeWindow> {
        self.keys().map(|k| k.time_window().lead_bounds()).collect()
    }

    /// Whether any key has a quantile threshold
    pub fn has_quantile_thresholds(&self) -> bool {
        self.keys().any(|k| k.threshold().is_quantile())
    }
}

impl<'a, T> IntoIterator for &'a MetricOutputMap<T> {
    type Item = (&'a MetricOutputKey, &'a T);
    type IntoIter = btree_map::Iter<'a, MetricOutputKey, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Builder for [`MetricOutputMap`]
#[derive(Debug, Clone)]
pub struct MetricOutputMapBuilder<T> {
    entries: BTreeMap<MetricOutputKey, T>,
    reference: Option<OutputMetadata>,
    metadata: Option<OutputMetadata>,
}

impl<T> Default for MetricOutputMapBuilder<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            reference: None,
            metadata: None,
        }
    }
}

impl<T: MetricOutput> MetricOutputMapBuilder<T> {
    /// Add an output; a later output at the same key replaces the earlier one
    pub fn put(mut self, key: MetricOutputKey, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// Override the store metadata
    ///
    /// Must be minimally equal to the metadata of the first output.
    pub fn with_metadata(mut self, metadata: OutputMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub(crate) fn insert(&mut self, key: MetricOutputKey, value: T) {
        if self.reference.is_none() {
            self.reference = Some(value.metadata().clone());
        }
        self.entries.insert(key, value);
    }

    /// Validate and freeze
    pub fn build(self) -> Result<MetricOutputMap<T>> {
        let reference = self
            .reference
            .ok_or_else(|| DataError::Empty("a metric output store needs at least one entry".into()))?;

        if let Some((key, value)) = self
            .entries
            .iter()
            .find(|(_, value)| !value.metadata().minimally_equals(&reference))
        {
            return Err(DataError::MetadataMismatch(format!(
                "output at {} has metadata {} which differs from {}",
                key,
                value.metadata(),
                reference
            ))
            .into());
        }

        let metadata = match self.metadata {
            Some(metadata) if !metadata.minimally_equals(&reference) => {
                return Err(DataError::MetadataMismatch(format!(
                    "override metadata {} differs from {}",
                    metadata, reference
                ))
                .into());
            },
            Some(metadata) => metadata,
            None => reference,
        };

        Ok(MetricOutputMap {
            entries: Arc::new(self.entries),
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{DoubleScoreOutput, MetricId};
    use crate::threshold::Operator;
    use chrono::{Duration, TimeZone, Utc};

    fn window(lower: i64, upper: i64) -> TimeWindow {
        TimeWindow::of_leads(Duration::hours(lower), Duration::hours(upper)).unwrap()
    }

    fn score(metric: MetricId, value: f64, window: TimeWindow) -> DoubleScoreOutput {
        DoubleScoreOutput::new(
            value,
            OutputMetadata::builder(metric).time_window(window).build(),
        )
    }

    fn key(w: TimeWindow, t: f64) -> MetricOutputKey {
        MetricOutputKey::new(w, Threshold::value(Operator::GreaterEqual, t).unwrap())
    }

    #[test]
    fn test_build_rejects_differing_metrics() {
        let result = MetricOutputMap::builder()
            .put(key(window(0, 6), 1.0), score(MetricId::MeanAbsoluteError, 1.0, window(0, 6)))
            .put(key(window(6, 12), 1.0), score(MetricId::MeanError, 1.0, window(6, 12)))
            .build();
        assert!(matches!(
            result,
            Err(Error::InvalidInput(DataError::MetadataMismatch(_)))
        ));
    }

    #[test]
    fn test_build_rejects_empty_and_bad_override() {
        let empty = MetricOutputMap::<DoubleScoreOutput>::builder().build();
        assert!(matches!(empty, Err(Error::InvalidInput(DataError::Empty(_)))));

        let bad = MetricOutputMap::builder()
            .put(key(window(0, 6), 1.0), score(MetricId::MeanError, 1.0, window(0, 6)))
            .with_metadata(OutputMetadata::builder(MetricId::BiasFraction).build())
            .build();
        assert!(bad.is_err());
    }

    #[test]
    fn test_slicing_and_lookup() {
        let store = MetricOutputMap::builder()
            .put(key(window(0, 6), 1.0), score(MetricId::MeanError, 1.0, window(0, 6)))
            .put(key(window(6, 12), 1.0), score(MetricId::MeanError, 2.0, window(6, 12)))
            .put(key(window(6, 12), 5.0), score(MetricId::MeanError, 3.0, window(6, 12)))
            .build()
            .unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.time_windows().len(), 2);
        assert_eq!(store.thresholds().len(), 2);
        assert!(!store.has_quantile_thresholds());

        let late = store.slice_by_time_window(&window(6, 12)).unwrap();
        assert_eq!(late.len(), 2);
        let high = store
            .slice_by_threshold(&Threshold::value(Operator::GreaterEqual, 5.0).unwrap())
            .unwrap();
        assert_eq!(high.values().next().unwrap().value(), 3.0);
        assert!(store.slice_by_time_window(&window(12, 18)).is_none());

        assert_eq!(store.value(&key(window(0, 6), 1.0)).unwrap().value(), 1.0);
        assert!(matches!(
            store.value(&key(window(0, 6), 5.0)),
            Err(Error::NoMatchingData(_))
        ));
    }

    #[test]
    fn test_slice_by_lead_ignores_reference_times() {
        let issued = TimeWindow::builder()
            .earliest_lead(Duration::zero())
            .latest_lead(Duration::hours(6))
            .earliest_reference_time(Utc.with_ymd_and_hms(1985, 1, 1, 0, 0, 0).unwrap())
            .build()
            .unwrap();
        let store = MetricOutputMap::builder()
            .put(key(issued, 1.0), score(MetricId::MeanError, 1.0, issued))
            .build()
            .unwrap();
        assert!(store.slice_by_time_window(&window(0, 6)).is_none());
        assert_eq!(store.slice_by_lead(&window(0, 6)).unwrap().len(), 1);
        assert_eq!(store.lead_windows().into_iter().next(), Some(window(0, 6)));
    }

    #[test]
    fn test_combine_is_last_write_wins() {
        let a = MetricOutputMap::builder()
            .put(key(window(0, 6), 1.0), score(MetricId::MeanError, 1.0, window(0, 6)))
            .with_metadata(OutputMetadata::builder(MetricId::MeanError).time_window(window(0, 6)).build())
            .build()
            .unwrap();
        let b = MetricOutputMap::builder()
            .put(key(window(0, 6), 1.0), score(MetricId::MeanError, 9.0, window(0, 6)))
            .put(key(window(6, 12), 1.0), score(MetricId::MeanError, 2.0, window(6, 12)))
            .with_metadata(OutputMetadata::builder(MetricId::MeanError).time_window(window(6, 12)).build())
            .build()
            .unwrap();

        let combined = MetricOutputMap::combine([&a, &b]).unwrap();
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.value(&key(window(0, 6), 1.0)).unwrap().value(), 9.0);
        assert_eq!(combined.metadata().time_window(), Some(&window(0, 12)));
    }
}
