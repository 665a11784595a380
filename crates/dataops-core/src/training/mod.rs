//! Model training over the silver layer.
//!
//! - `dataset` - labelled samples and the train/test split
//! - `logistic` - the classifier
//! - `metrics` - confusion-matrix metrics and the metrics artifact
//! - `artifacts` - atomic JSON artifacts on disk

pub mod artifacts;
pub mod dataset;
mod logistic;
mod metrics;

pub use artifacts::{ArtifactDir, ModelSchema, RunMetadata};
pub use logistic::{FitOptions, LogisticRegression};
pub use metrics::{ConfusionCounts, MetricsArtifact};

use crate::warehouse::{TableName, Warehouse};
use crate::{timestamp, DataOpsError, Result};
use dataset::Sample;
use tracing::info;

/// Result of one training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: LogisticRegression,
    pub metrics: MetricsArtifact,
    pub artifact_dir: ArtifactDir,
}

/// Trains the risk classifier and writes its artifacts.
#[derive(Debug, Clone)]
pub struct Trainer {
    warehouse: Warehouse,
    silver: TableName,
    options: FitOptions,
}

impl Trainer {
    pub fn new(warehouse: &Warehouse, silver: TableName) -> Self {
        Self {
            warehouse: warehouse.clone(),
            silver,
            options: FitOptions::default(),
        }
    }

    /// Fit on the silver table and write model, metrics, schema and run
    /// metadata into `artifact_dir`.
    ///
    /// An empty silver table is an error; nothing is written in that case.
    pub fn train(
        &self,
        model_name: &str,
        source_revision: &str,
        artifact_dir: ArtifactDir,
    ) -> Result<TrainingOutcome> {
        let samples = dataset::load_samples(&self.warehouse, &self.silver)?;
        if samples.is_empty() {
            return Err(DataOpsError::EmptyDataset {
                table: self.silver.to_string(),
            });
        }

        let split = dataset::split(&samples);
        let (train_x, train_y) = unzip(&split.train);
        let model = LogisticRegression::fit(&train_x, &train_y, self.options);

        let (test_x, test_y) = unzip(&split.test);
        let predicted: Vec<bool> = test_x.iter().map(|row| model.predict(row)).collect();
        let counts = ConfusionCounts::from_predictions(&test_y, &predicted);

        let metrics = MetricsArtifact {
            accuracy: Some(counts.accuracy()),
            precision: Some(counts.precision()),
            recall: Some(counts.recall()),
            f1: Some(counts.f1()),
            rows: samples.len() as u64,
            note: split.note.to_string(),
        };

        artifact_dir.write_model(&model)?;
        artifact_dir.write_schema(&ModelSchema {
            features: dataset::FEATURES.iter().map(|f| f.to_string()).collect(),
            label: dataset::LABEL.to_string(),
            source: self.silver.to_string(),
        })?;
        artifact_dir.write_run_metadata(&RunMetadata {
            model_name: model_name.to_string(),
            source_revision: source_revision.to_string(),
            created_at_utc: timestamp::now(),
        })?;
        // Metrics last: their presence marks a complete artifact set.
        artifact_dir.write_metrics(&metrics)?;

        info!(
            "Trained {} on {} rows ({}): accuracy={:.4} f1={:.4}",
            model_name,
            metrics.rows,
            metrics.note,
            counts.accuracy(),
            counts.f1()
        );

        Ok(TrainingOutcome {
            model,
            metrics,
            artifact_dir,
        })
    }
}

fn unzip(samples: &[Sample]) -> (Vec<Vec<f64>>, Vec<bool>) {
    samples.iter().map(|s| (s.features(), s.is_risky)).unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn silver_with(warehouse: &Warehouse, table: &TableName, clean: usize, risky: usize) {
        warehouse
            .execute_batch(&format!(
                "CREATE TABLE {} (customer_id INTEGER, name TEXT, age INTEGER,
                    dq_is_name_null INTEGER, dq_is_underage INTEGER, dq_status TEXT)",
                table.quoted()
            ))
            .unwrap();
        let mut sql = String::new();
        for i in 0..clean {
            sql.push_str(&format!(
                "INSERT INTO {} VALUES ({i}, 'c{i}', 30, 0, 0, 'PASS');",
                table.quoted()
            ));
        }
        for i in 0..risky {
            let (null, under) = if i % 2 == 0 { (1, 0) } else { (0, 1) };
            sql.push_str(&format!(
                "INSERT INTO {} VALUES ({}, NULL, 16, {null}, {under}, 'FAIL');",
                table.quoted(),
                clean + i
            ));
        }
        if !sql.is_empty() {
            warehouse.execute_batch(&sql).unwrap();
        }
    }

    #[test]
    fn test_train_writes_all_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let warehouse = Warehouse::open_in_memory().unwrap();
        let silver = TableName::parse("dataops.silver").unwrap();
        silver_with(&warehouse, &silver, 40, 10);

        let dir = ArtifactDir::new(temp_dir.path().join("artifacts"));
        let outcome = Trainer::new(&warehouse, silver)
            .train("customer_risk", "abc1234", dir)
            .unwrap();

        assert_eq!(outcome.metrics.rows, 50);
        assert_eq!(outcome.metrics.note, dataset::NOTE_SPLIT);
        assert_eq!(outcome.metrics.accuracy, Some(1.0));
        assert_eq!(outcome.metrics.f1, Some(1.0));

        let root = outcome.artifact_dir.root();
        for file in [
            artifacts::METRICS_FILE,
            artifacts::MODEL_FILE,
            artifacts::SCHEMA_FILE,
            artifacts::RUN_METADATA_FILE,
        ] {
            assert!(root.join(file).exists(), "missing {file}");
        }
        assert_eq!(outcome.artifact_dir.load_metrics().unwrap(), outcome.metrics);
        assert!(outcome.artifact_dir.load_model().unwrap().is_some());
    }

    #[test]
    fn test_single_class_scores_zero_f1() {
        let temp_dir = TempDir::new().unwrap();
        let warehouse = Warehouse::open_in_memory().unwrap();
        let silver = TableName::parse("silver").unwrap();
        silver_with(&warehouse, &silver, 20, 0);

        let outcome = Trainer::new(&warehouse, silver)
            .train("customer_risk", "abc1234", ArtifactDir::new(temp_dir.path()))
            .unwrap();

        assert_eq!(outcome.metrics.note, dataset::NOTE_SAME_DATA);
        assert_eq!(outcome.metrics.accuracy, Some(1.0));
        assert_eq!(outcome.metrics.f1, Some(0.0));
    }

    #[test]
    fn test_empty_silver_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let warehouse = Warehouse::open_in_memory().unwrap();
        let silver = TableName::parse("silver").unwrap();
        silver_with(&warehouse, &silver, 0, 0);

        let err = Trainer::new(&warehouse, silver)
            .train("customer_risk", "abc1234", ArtifactDir::new(temp_dir.path()))
            .unwrap_err();

        assert!(matches!(err, DataOpsError::EmptyDataset { .. }));
        assert!(!temp_dir.path().join(artifacts::METRICS_FILE).exists());
    }

    #[test]
    fn test_missing_silver_is_input_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let warehouse = Warehouse::open_in_memory().unwrap();

        let err = Trainer::new(&warehouse, TableName::parse("nope").unwrap())
            .train("customer_risk", "abc1234", ArtifactDir::new(temp_dir.path()))
            .unwrap_err();

        assert!(matches!(err, DataOpsError::InputNotFound { .. }));
    }
}
