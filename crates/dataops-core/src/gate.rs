//! Quality gate over trained model metrics.
//!
//! The gate is a pure function: identical metrics always produce the same
//! decision and nothing is read or written. Missing or non-finite metrics
//! count as `0.0`, so an incomplete metrics record can never be admitted.

use crate::{DataOpsError, Result};
use serde::{Deserialize, Serialize};

/// Minimum metric values a model must reach to be registered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateThresholds {
    pub min_accuracy: f64,
    pub min_f1: f64,
}

impl GateThresholds {
    pub const DEFAULT_MIN_ACCURACY: f64 = 0.80;
    pub const DEFAULT_MIN_F1: f64 = 0.75;

    /// Build thresholds, rejecting values outside `[0, 1]`.
    pub fn new(min_accuracy: f64, min_f1: f64) -> Result<Self> {
        for (name, value) in [("min_accuracy", min_accuracy), ("min_f1", min_f1)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(DataOpsError::config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(Self {
            min_accuracy,
            min_f1,
        })
    }
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            min_accuracy: Self::DEFAULT_MIN_ACCURACY,
            min_f1: Self::DEFAULT_MIN_F1,
        }
    }
}

/// Binary outcome of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Admit,
    Reject,
}

/// A criterion the metrics did not meet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric", rename_all = "snake_case")]
pub enum GateFailure {
    Accuracy { actual: f64, required: f64 },
    F1 { actual: f64, required: f64 },
}

impl std::fmt::Display for GateFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateFailure::Accuracy { actual, required } => {
                write!(f, "accuracy {actual:.4} < {required:.4}")
            }
            GateFailure::F1 { actual, required } => write!(f, "f1 {actual:.4} < {required:.4}"),
        }
    }
}

/// Full gate decision, including the values it was made on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub verdict: Verdict,
    pub accuracy: f64,
    pub f1: f64,
    pub thresholds: GateThresholds,
    pub failures: Vec<GateFailure>,
}

impl GateDecision {
    pub fn is_admitted(&self) -> bool {
        self.verdict == Verdict::Admit
    }
}

/// The quality gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityGate {
    thresholds: GateThresholds,
}

impl QualityGate {
    pub fn new(thresholds: GateThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> GateThresholds {
        self.thresholds
    }

    /// Admit iff `accuracy >= min_accuracy` and `f1 >= min_f1`.
    pub fn evaluate(&self, accuracy: Option<f64>, f1: Option<f64>) -> GateDecision {
        let accuracy = fail_closed(accuracy);
        let f1 = fail_closed(f1);

        let mut failures = Vec::new();
        if accuracy < self.thresholds.min_accuracy {
            failures.push(GateFailure::Accuracy {
                actual: accuracy,
                required: self.thresholds.min_accuracy,
            });
        }
        if f1 < self.thresholds.min_f1 {
            failures.push(GateFailure::F1 {
                actual: f1,
                required: self.thresholds.min_f1,
            });
        }

        GateDecision {
            verdict: if failures.is_empty() {
                Verdict::Admit
            } else {
                Verdict::Reject
            },
            accuracy,
            f1,
            thresholds: self.thresholds,
            failures,
        }
    }
}

fn fail_closed(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> QualityGate {
        QualityGate::default()
    }

    #[test]
    fn test_admits_when_both_thresholds_met() {
        let decision = gate().evaluate(Some(0.9), Some(0.8));
        assert!(decision.is_admitted());
        assert!(decision.failures.is_empty());
    }

    #[test]
    fn test_exact_threshold_values_admit() {
        assert!(gate().evaluate(Some(0.80), Some(0.75)).is_admitted());
    }

    #[test]
    fn test_rejects_just_below_either_threshold() {
        let low_acc = gate().evaluate(Some(0.7999), Some(0.9));
        assert_eq!(low_acc.verdict, Verdict::Reject);
        assert!(matches!(low_acc.failures[..], [GateFailure::Accuracy { .. }]));

        let low_f1 = gate().evaluate(Some(0.95), Some(0.7499));
        assert_eq!(low_f1.verdict, Verdict::Reject);
        assert!(matches!(low_f1.failures[..], [GateFailure::F1 { .. }]));
    }

    #[test]
    fn test_missing_metrics_fail_closed() {
        let decision = gate().evaluate(None, Some(0.99));
        assert_eq!(decision.verdict, Verdict::Reject);
        assert_eq!(decision.accuracy, 0.0);

        let empty = gate().evaluate(None, None);
        assert_eq!(empty.failures.len(), 2);
    }

    #[test]
    fn test_non_finite_metrics_reject() {
        assert!(!gate().evaluate(Some(f64::NAN), Some(0.9)).is_admitted());
        assert!(!gate().evaluate(Some(0.9), Some(f64::INFINITY)).is_admitted());
    }

    #[test]
    fn test_decision_is_deterministic() {
        let first = gate().evaluate(Some(0.81), Some(0.74));
        let second = gate().evaluate(Some(0.81), Some(0.74));
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_thresholds() {
        let strict = QualityGate::new(GateThresholds::new(0.95, 0.9).unwrap());
        assert!(!strict.evaluate(Some(0.9), Some(0.95)).is_admitted());
        assert!(GateThresholds::new(1.5, 0.5).is_err());
        assert!(GateThresholds::new(0.5, f64::NAN).is_err());
    }

    #[test]
    fn test_failure_display() {
        let failure = GateFailure::F1 {
            actual: 0.5,
            required: 0.75,
        };
        assert_eq!(failure.to_string(), "f1 0.5000 < 0.7500");
    }
}
