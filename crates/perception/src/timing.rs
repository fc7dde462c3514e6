use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

pub const T_BIOME_SUMMARY_MS: &str = "tBiomeSummaryMs";
pub const T_PEAKS_SORT_MS: &str = "tPeaksSortMs";
pub const PEAKS_COUNT: &str = "peaksCount";
pub const T_FILTER_TILES_MS: &str = "tFilterTilesMs";
pub const TILES_COUNT: &str = "tilesCount";

/// Caller-owned sink for per-request instrumentation.
///
/// Fields are named by the caller's schema and are additive: recording the
/// same field twice sums the values.
pub trait TimingSink {
    fn record(&mut self, field: &str, value: f64);
}

/// Map-backed timing sink. Iterates in field-name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimingMetrics {
    fields: BTreeMap<String, f64>,
}

impl TimingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl TimingSink for TimingMetrics {
    fn record(&mut self, field: &str, value: f64) {
        *self.fields.entry(field.to_string()).or_insert(0.0) += value;
    }
}

/// Milliseconds since `start`, with sub-millisecond precision.
pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_additive() {
        let mut m = TimingMetrics::new();
        m.record(PEAKS_COUNT, 2.0);
        m.record(PEAKS_COUNT, 1.0);
        assert_eq!(m.get(PEAKS_COUNT), Some(3.0));
        assert_eq!(m.get(TILES_COUNT), None);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn iterates_in_name_order() {
        let mut m = TimingMetrics::new();
        m.record(T_PEAKS_SORT_MS, 0.5);
        m.record(PEAKS_COUNT, 3.0);
        let names: Vec<&str> = m.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec![PEAKS_COUNT, T_PEAKS_SORT_MS]);
    }

    #[test]
    fn serializes_as_flat_object() {
        let mut m = TimingMetrics::new();
        m.record(T_BIOME_SUMMARY_MS, 1.5);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"tBiomeSummaryMs":1.5}"#);
    }
}
