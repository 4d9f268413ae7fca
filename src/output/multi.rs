//! Keyed stores grouped per metric

use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

use super::key::{MetricKey, MetricOutputKey};
use super::store::{MetricOutputMap, MetricOutputMapBuilder};
use super::values::MetricOutput;
use crate::error::{DataError, Error, Result};
use crate::threshold::Threshold;
use crate::time::TimeWindow;

/// Outputs of every metric computed for one cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellOutputs<T> {
    outputs: BTreeMap<MetricKey, T>,
}

impl<T> Default for CellOutputs<T> {
    fn default() -> Self {
        Self {
            outputs: BTreeMap::new(),
        }
    }
}

impl<T> CellOutputs<T> {
    /// No outputs
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output, replacing any previous output of the same metric
    pub fn insert(&mut self, metric: impl Into<MetricKey>, output: T) -> Option<T> {
        self.outputs.insert(metric.into(), output)
    }

    /// Add every output of `other`, which wins on shared metrics
    pub fn merge(&mut self, other: CellOutputs<T>) {
        self.outputs.extend(other.outputs);
    }

    /// Output of one metric
    pub fn get(&self, metric: &MetricKey) -> Option<&T> {
        self.outputs.get(metric)
    }

    /// Number of metrics
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Whether there is no output
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Outputs in metric order
    pub fn iter(&self) -> btree_map::Iter<'_, MetricKey, T> {
        self.outputs.iter()
    }
}

impl<K: Into<MetricKey>, T> FromIterator<(K, T)> for CellOutputs<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        Self {
            outputs: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<T> IntoIterator for CellOutputs<T> {
    type Item = (MetricKey, T);
    type IntoIter = btree_map::IntoIter<MetricKey, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.outputs.into_iter()
    }
}

/// Keyed stores of one output shape, one per metric
#[derive(Debug, Clone, PartialEq)]
pub struct MetricOutputMultiMap<T> {
    stores: BTreeMap<MetricKey, MetricOutputMap<T>>,
}

impl<T: MetricOutput> MetricOutputMultiMap<T> {
    /// Start a builder
    pub fn builder() -> MetricOutputMultiMapBuilder<T> {
        MetricOutputMultiMapBuilder::default()
    }

    fn restrict(&self, slice: impl Fn(&MetricOutputMap<T>) -> Option<MetricOutputMap<T>>) -> Option<Self> {
        let stores: BTreeMap<MetricKey, MetricOutputMap<T>> = self
            .stores
            .iter()
            .filter_map(|(metric, store)| slice(store).map(|s| (*metric, s)))
            .collect();
        (!stores.is_empty()).then_some(Self { stores })
    }

    /// Every metric restricted to one time window, `None` when nothing matches
    pub fn slice_by_time_window(&self, window: &TimeWindow) -> Option<Self> {
        self.restrict(|store| store.slice_by_time_window(window))
    }

    /// Every metric restricted to one threshold, `None` when nothing matches
    pub fn slice_by_threshold(&self, threshold: &Threshold) -> Option<Self> {
        self.restrict(|store| store.slice_by_threshold(threshold))
    }
}

impl<T> MetricOutputMultiMap<T> {
    /// Store of one metric
    pub fn get(&self, metric: &MetricKey) -> Option<&MetricOutputMap<T>> {
        self.stores.get(metric)
    }

    /// Store of one metric, failing when the metric has no output
    pub fn require(&self, metric: &MetricKey) -> Result<&MetricOutputMap<T>> {
        self.stores
            .get(metric)
            .ok_or_else(|| Error::NoMatchingData(format!("no output for metric {}", metric)))
    }

    /// Metrics with output, in order
    pub fn metrics(&self) -> impl Iterator<Item = MetricKey> + '_ {
        self.stores.keys().copied()
    }

    /// Number of metrics
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Always false, a multi-metric store holds at least one metric
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Stores in metric order
    pub fn iter(&self) -> btree_map::Iter<'_, MetricKey, MetricOutputMap<T>> {
        self.stores.iter()
    }

    /// Distinct cell coordinates across metrics
    pub fn keys(&self) -> BTreeSet<MetricOutputKey> {
        self.stores.values().flat_map(|s| s.keys().cloned()).collect()
    }

    /// Distinct time windows across metrics
    pub fn time_windows(&self) -> BTreeSet<TimeWindow> {
        self.stores.values().flat_map(|s| s.time_windows()).collect()
    }

    /// Distinct thresholds across metrics
    pub fn thresholds(&self) -> BTreeSet<Threshold> {
        self.stores.values().flat_map(|s| s.thresholds()).collect()
    }
}

impl<'a, T> IntoIterator for &'a MetricOutputMultiMap<T> {
    type Item = (&'a MetricKey, &'a MetricOutputMap<T>);
    type IntoIter = btree_map::Iter<'a, MetricKey, MetricOutputMap<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Builder for [`MetricOutputMultiMap`]
#[derive(Debug, Clone)]
pub struct MetricOutputMultiMapBuilder<T> {
    builders: BTreeMap<MetricKey, MetricOutputMapBuilder<T>>,
}

impl<T> Default for MetricOutputMultiMapBuilder<T> {
    fn default() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }
}

impl<T: MetricOutput> MetricOutputMultiMapBuilder<T> {
    /// Add one output
    pub fn put(mut self, metric: impl Into<MetricKey>, key: MetricOutputKey, output: T) -> Self {
        self.insert(metric.into(), key, output);
        self
    }

    /// Add every output of one cell
    pub fn add(mut self, key: MetricOutputKey, outputs: CellOutputs<T>) -> Self {
        self.add_cell(&key, outputs);
        self
    }

    pub(crate) fn add_cell(&mut self, key: &MetricOutputKey, outputs: CellOutputs<T>) {
        for (metric, output) in outputs {
            self.insert(metric, key.clone(), output);
        }
    }

    fn insert(&mut self, metric: MetricKey, key: MetricOutputKey, output: T) {
        self.builders.entry(metric).or_default().insert(key, output);
    }

    /// Validate and freeze every keyed store
    pub fn build(self) -> Result<MetricOutputMultiMap<T>> {
        if self.builders.is_empty() {
            return Err(DataError::Empty("a multi-metric store needs at least one output".into()).into());
        }
        let stores = self
            .builders
            .into_iter()
            .map(|(metric, builder)| Ok((metric, builder.build()?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(MetricOutputMultiMap { stores })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{DoubleScoreOutput, MetricId, OutputMetadata};
    use crate::threshold::Operator;
    use chrono::Duration;

    fn window(lower: i64, upper: i64) -> TimeWindow {
        TimeWindow::of_leads(Duration::hours(lower), Duration::hours(upper)).unwrap()
    }

    fn key(w: TimeWindow) -> MetricOutputKey {
        MetricOutputKey::new(w, Threshold::value(Operator::GreaterEqual, 1.0).unwrap())
    }

    fn score(metric: MetricId, value: f64) -> DoubleScoreOutput {
        DoubleScoreOutput::new(value, OutputMetadata::builder(metric).build())
    }

    fn cell(mae: f64, rmse: f64) -> CellOutputs<DoubleScoreOutput> {
        [
            (MetricId::MeanAbsoluteError, score(MetricId::MeanAbsoluteError, mae)),
            (MetricId::RootMeanSquareError, score(MetricId::RootMeanSquareError, rmse)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_bulk_insert_groups_by_metric() {
        let store = MetricOutputMultiMap::builder()
            .add(key(window(0, 6)), cell(1.0, 2.0))
            .add(key(window(6, 12)), cell(3.0, 4.0))
            .build()
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.keys().len(), 2);
        let rmse = store.require(&MetricId::RootMeanSquareError.into()).unwrap();
        assert_eq!(rmse.value(&key(window(6, 12))).unwrap().value(), 4.0);
        assert!(matches!(
            store.require(&MetricId::MeanError.into()),
            Err(Error::NoMatchingData(_))
        ));
    }

    #[test]
    fn test_slice_across_metrics() {
        let store = MetricOutputMultiMap::builder()
            .add(key(window(0, 6)), cell(1.0, 2.0))
            .add(key(window(6, 12)), cell(3.0, 4.0))
            .build()
            .unwrap();

        let early = store.slice_by_time_window(&window(0, 6)).unwrap();
        assert_eq!(early.len(), 2);
        assert_eq!(early.time_windows().len(), 1);
        assert!(store.slice_by_time_window(&window(1, 2)).is_none());
    }

    #[test]
    fn test_cell_merge_is_last_write_wins() {
        let mut merged = cell(1.0, 2.0);
        merged.merge([(MetricId::MeanAbsoluteError, score(MetricId::MeanAbsoluteError, 9.0))]
            .into_iter()
            .collect());
        assert_eq!(merged.len(), 2);
        assert_eq!(
            merged.get(&MetricId::MeanAbsoluteError.into()).unwrap().value(),
            9.0
        );
    }

    #[test]
    fn test_empty_build_fails() {
        assert!(MetricOutputMultiMap::<DoubleScoreOutput>::builder().build().is_err());
    }
}
