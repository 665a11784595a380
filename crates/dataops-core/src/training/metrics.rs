//! Classification metrics and the metrics artifact handed to the gate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Contents of `metrics.json`.
///
/// Self-contained: the gate and registration need nothing else. Metrics absent
/// from the file stay `None` and are treated as `0` by the gate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recall: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f1: Option<f64>,
    #[serde(default)]
    pub rows: u64,
    #[serde(default)]
    pub note: String,
}

impl MetricsArtifact {
    /// Numeric metrics as stored in the registry. The free-text note is dropped.
    pub fn to_metric_map(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        for (name, value) in [
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1", self.f1),
        ] {
            if let Some(value) = value {
                map.insert(name.to_string(), value);
            }
        }
        map.insert("rows".to_string(), self.rows as f64);
        map
    }
}

/// Binary confusion counts with `true` as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionCounts {
    pub true_positive: u64,
    pub false_positive: u64,
    pub true_negative: u64,
    pub false_negative: u64,
}

impl ConfusionCounts {
    pub fn from_predictions(actual: &[bool], predicted: &[bool]) -> Self {
        let mut counts = Self::default();
        for (&a, &p) in actual.iter().zip(predicted) {
            match (a, p) {
                (true, true) => counts.true_positive += 1,
                (false, true) => counts.false_positive += 1,
                (false, false) => counts.true_negative += 1,
                (true, false) => counts.false_negative += 1,
            }
        }
        counts
    }

    fn total(&self) -> u64 {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn f1(&self) -> f64 {
        ratio(
            2 * self.true_positive,
            2 * self.true_positive + self.false_positive + self.false_negative,
        )
    }
}

/// `num / den`, or `0.0` when the denominator is zero.
fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_metrics() {
        let actual = [true, true, false, false, true];
        let predicted = [true, false, false, true, true];
        let counts = ConfusionCounts::from_predictions(&actual, &predicted);

        assert_eq!(counts.true_positive, 2);
        assert_eq!(counts.false_negative, 1);
        assert_eq!(counts.false_positive, 1);
        assert_eq!(counts.true_negative, 1);
        assert!((counts.accuracy() - 0.6).abs() < 1e-12);
        assert!((counts.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((counts.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!((counts.f1() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_is_zero() {
        let counts = ConfusionCounts::from_predictions(&[false, false], &[false, false]);
        assert_eq!(counts.accuracy(), 1.0);
        assert_eq!(counts.precision(), 0.0);
        assert_eq!(counts.recall(), 0.0);
        assert_eq!(counts.f1(), 0.0);
    }

    #[test]
    fn test_missing_fields_deserialize_as_none() {
        let metrics: MetricsArtifact = serde_json::from_str(r#"{"f1": 0.8}"#).unwrap();
        assert_eq!(metrics.accuracy, None);
        assert_eq!(metrics.f1, Some(0.8));
        assert_eq!(metrics.rows, 0);
    }

    #[test]
    fn test_metric_map_skips_missing_and_note() {
        let metrics = MetricsArtifact {
            accuracy: Some(0.9),
            f1: Some(0.8),
            rows: 12,
            note: "hello".into(),
            ..Default::default()
        };
        let map = metrics.to_metric_map();
        assert_eq!(map.len(), 3);
        assert_eq!(map["rows"], 12.0);
        assert!(!map.contains_key("precision"));
    }
}
