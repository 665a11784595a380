//! Binary logistic regression fitted by batch gradient descent.
//!
//! Deterministic: weights start at zero and every step uses the full batch,
//! so the same data always yields the same model.

use serde::{Deserialize, Serialize};

/// Hyper-parameters for [`LogisticRegression::fit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub learning_rate: f64,
    pub iterations: usize,
    /// L2 penalty on the weights. The intercept is not penalized.
    pub l2: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            iterations: 2_000,
            l2: 0.001,
        }
    }
}

/// A fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl LogisticRegression {
    /// Fit on `features` (one row per sample) and boolean `labels`.
    ///
    /// Returns a zero model when there are no samples.
    pub fn fit(features: &[Vec<f64>], labels: &[bool], options: FitOptions) -> Self {
        let dims = features.first().map_or(0, |row| row.len());
        let mut model = Self {
            weights: vec![0.0; dims],
            intercept: 0.0,
        };
        let n = features.len().min(labels.len());
        if n == 0 {
            return model;
        }
        let scale = 1.0 / n as f64;

        for _ in 0..options.iterations {
            let mut grad_w = vec![0.0; dims];
            let mut grad_b = 0.0;
            for (row, &label) in features.iter().zip(labels).take(n) {
                let error = model.predict_proba(row) - if label { 1.0 } else { 0.0 };
                for (g, x) in grad_w.iter_mut().zip(row) {
                    *g += error * x;
                }
                grad_b += error;
            }
            for (w, g) in model.weights.iter_mut().zip(&grad_w) {
                *w -= options.learning_rate * (g * scale + options.l2 * *w);
            }
            model.intercept -= options.learning_rate * grad_b * scale;
        }

        model
    }

    /// Probability of the positive class.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let z = self.intercept
            + self
                .weights
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        sigmoid(z)
    }

    pub fn predict(&self, row: &[f64]) -> bool {
        self.predict_proba(row) >= 0.5
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learns_flag_features() {
        // Label is true iff either flag is set.
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for _ in 0..8 {
            features.push(vec![0.0, 0.0]);
            labels.push(false);
        }
        features.push(vec![1.0, 0.0]);
        labels.push(true);
        features.push(vec![0.0, 1.0]);
        labels.push(true);

        let model = LogisticRegression::fit(&features, &labels, FitOptions::default());

        assert!(!model.predict(&[0.0, 0.0]));
        assert!(model.predict(&[1.0, 0.0]));
        assert!(model.predict(&[0.0, 1.0]));
        assert!(model.weights.iter().all(|w| *w > 0.0));
        assert!(model.intercept < 0.0);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let features = vec![vec![0.0], vec![1.0], vec![0.0], vec![1.0]];
        let labels = vec![false, true, false, true];
        let a = LogisticRegression::fit(&features, &labels, FitOptions::default());
        let b = LogisticRegression::fit(&features, &labels, FitOptions::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_input_gives_zero_model() {
        let model = LogisticRegression::fit(&[], &[], FitOptions::default());
        assert!(model.weights.is_empty());
        assert_eq!(model.predict_proba(&[]), 0.5);
    }
}
