//! Pipeline orchestration: validate → train → gate → register → promote.
//!
//! Each stage consumes what the previous one produced. The first error stops
//! the run and is reported together with the stage that raised it. A gate
//! rejection is not an error: the run ends early with
//! [`PipelineOutcome::Rejected`] and nothing is registered.

use crate::config::PipelineConfig;
use crate::gate::{GateDecision, QualityGate};
use crate::quality::{QualityRecorder, ValidationReport};
use crate::registry::{version_id, ModelRegistry, ModelVersionRecord, NewModelVersion};
use crate::training::{ArtifactDir, MetricsArtifact, Trainer, TrainingOutcome};
use crate::warehouse::Warehouse;
use crate::{DataOpsError, ErrorKind, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validate,
    Train,
    Gate,
    Register,
    Promote,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Train => "train",
            Stage::Gate => "gate",
            Stage::Register => "register",
            Stage::Promote => "promote",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised by one stage of [`Pipeline::run`].
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    pub source: DataOpsError,
}

impl StageError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageError>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageError> {
        self.map_err(|source| StageError { stage, source })
    }
}

/// How a full run ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Promoted(ModelVersionRecord),
    Rejected(GateDecision),
}

/// Everything a full run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub validation: ValidationReport,
    pub metrics: MetricsArtifact,
    pub decision: GateDecision,
    pub registered: Option<ModelVersionRecord>,
    pub outcome: PipelineOutcome,
}

impl PipelineReport {
    pub fn is_promoted(&self) -> bool {
        matches!(self.outcome, PipelineOutcome::Promoted(_))
    }
}

/// The pipeline over one warehouse and configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    warehouse: Warehouse,
}

impl Pipeline {
    /// Open the configured warehouse.
    pub fn open(config: PipelineConfig) -> Result<Self> {
        let warehouse = Warehouse::open(&config.warehouse)?;
        Ok(Self::with_warehouse(config, warehouse))
    }

    pub fn with_warehouse(config: PipelineConfig, warehouse: Warehouse) -> Self {
        Self { config, warehouse }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    fn artifacts(&self) -> ArtifactDir {
        ArtifactDir::new(&self.config.artifact_dir)
    }

    fn registry(&self) -> Result<ModelRegistry> {
        ModelRegistry::open(&self.warehouse, self.config.tables.registry.clone())
    }

    // ========================================
    // Stages
    // ========================================

    /// Record the quality checks for the silver table under the run id.
    ///
    /// Check severities are recorded, not enforced: a `FAIL` row is logged
    /// and the pipeline continues.
    pub fn validate(&self) -> Result<ValidationReport> {
        let recorder =
            QualityRecorder::open(&self.warehouse, self.config.tables.dq_results.clone())?;
        let report = recorder.record_run(&self.config.run_id, &self.config.tables.silver)?;
        if report.has_failures() {
            warn!(
                "Validation run {} recorded FAIL checks on {}",
                report.run_id, report.target
            );
        }
        Ok(report)
    }

    /// Train on the silver table and write artifacts.
    pub fn train(&self) -> Result<TrainingOutcome> {
        Trainer::new(&self.warehouse, self.config.tables.silver.clone()).train(
            &self.config.model_name,
            &self.config.provenance.source_revision,
            self.artifacts(),
        )
    }

    /// Evaluate the metrics artifact against the configured thresholds.
    pub fn gate(&self) -> Result<GateDecision> {
        let metrics = self.artifacts().load_metrics()?;
        Ok(self.gate_metrics(&metrics))
    }

    /// Evaluate an in-memory metrics record against the configured thresholds.
    pub fn gate_metrics(&self, metrics: &MetricsArtifact) -> GateDecision {
        let decision = QualityGate::new(self.config.thresholds).evaluate(metrics.accuracy, metrics.f1);
        log_decision(&decision);
        decision
    }

    /// Register the model described by the metrics artifact.
    pub fn register(&self) -> Result<ModelVersionRecord> {
        let metrics = self.artifacts().load_metrics()?;
        self.register_metrics(&metrics, Utc::now())
    }

    /// Register `metrics` as a new version, using `now` for the version id
    /// and creation time.
    pub fn register_metrics(
        &self,
        metrics: &MetricsArtifact,
        now: DateTime<Utc>,
    ) -> Result<ModelVersionRecord> {
        let new = NewModelVersion {
            model_name: self.config.model_name.clone(),
            model_version: version_id::generate(now, &self.config.provenance.source_revision),
            metrics: metrics.to_metric_map(),
            artifact_uri: self.config.artifact_uri(),
            source_revision: self.config.provenance.source_revision.clone(),
            data_source: self.config.tables.silver.to_string(),
        };
        self.registry()?.register_at(&new, now)
    }

    /// Promote the newest registered version to production.
    pub fn promote(&self) -> Result<ModelVersionRecord> {
        self.registry()?.promote(&self.config.model_name)
    }

    pub fn current(&self) -> Result<Option<ModelVersionRecord>> {
        self.registry()?.current(&self.config.model_name)
    }

    /// Every version of the configured model, newest first.
    pub fn history(&self) -> Result<Vec<ModelVersionRecord>> {
        self.registry()?.list(&self.config.model_name)
    }

    // ========================================
    // Full run
    // ========================================

    pub fn run(&self) -> std::result::Result<PipelineReport, StageError> {
        self.run_at(Utc::now())
    }

    /// Run every stage in order, registering with the given clock reading.
    ///
    /// The metrics produced by training are handed to the gate and to
    /// registration in memory; the artifact on disk is not read back.
    pub fn run_at(&self, now: DateTime<Utc>) -> std::result::Result<PipelineReport, StageError> {
        info!(
            "Pipeline run {} for model {}",
            self.config.run_id, self.config.model_name
        );

        let validation = self.validate().at(Stage::Validate)?;
        let training = self.train().at(Stage::Train)?;
        let decision = self.gate_metrics(&training.metrics);

        if !decision.is_admitted() {
            info!("Pipeline stopped at the quality gate; nothing registered");
            return Ok(PipelineReport {
                validation,
                metrics: training.metrics,
                decision: decision.clone(),
                registered: None,
                outcome: PipelineOutcome::Rejected(decision),
            });
        }

        let registered = self
            .register_metrics(&training.metrics, now)
            .at(Stage::Register)?;
        let promoted = self.promote().at(Stage::Promote)?;

        info!(
            "Pipeline promoted {} {}",
            promoted.model_name, promoted.model_version
        );
        Ok(PipelineReport {
            validation,
            metrics: training.metrics,
            decision,
            registered: Some(registered),
            outcome: PipelineOutcome::Promoted(promoted),
        })
    }
}

fn log_decision(decision: &GateDecision) {
    if decision.is_admitted() {
        info!(
            "Quality gate passed: accuracy={:.4} f1={:.4}",
            decision.accuracy, decision.f1
        );
    } else {
        let reasons: Vec<String> = decision.failures.iter().map(|f| f.to_string()).collect();
        warn!("Quality gate failed: {}", reasons.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pipeline(temp_dir: &TempDir) -> Pipeline {
        let mut config = PipelineConfig::new(temp_dir.path().join("warehouse.db"));
        config.artifact_dir = temp_dir.path().join("artifacts");
        config.provenance.source_revision = "abc1234def".to_string();
        Pipeline::open(config).unwrap()
    }

    fn write_metrics(pipeline: &Pipeline, accuracy: f64, f1: f64) {
        pipeline
            .artifacts()
            .write_metrics(&MetricsArtifact {
                accuracy: Some(accuracy),
                f1: Some(f1),
                rows: 100,
                ..Default::default()
            })
            .unwrap();
    }

    #[test]
    fn test_gate_without_metrics_is_input_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let err = pipeline(&temp_dir).gate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputNotFound);
    }

    #[test]
    fn test_gate_reads_metrics_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = pipeline(&temp_dir);

        write_metrics(&pipeline, 0.9, 0.7);
        assert!(!pipeline.gate().unwrap().is_admitted());

        write_metrics(&pipeline, 0.8, 0.75);
        assert!(pipeline.gate().unwrap().is_admitted());
    }

    #[test]
    fn test_register_builds_version_from_clock_and_revision() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = pipeline(&temp_dir);
        let metrics = MetricsArtifact {
            accuracy: Some(0.9),
            f1: Some(0.8),
            rows: 100,
            ..Default::default()
        };

        let now = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = pipeline.register_metrics(&metrics, now).unwrap();

        assert_eq!(record.model_version, "v20240102030405-abc1234");
        assert_eq!(record.model_name, "customer_risk");
        assert_eq!(record.data_source, "dataops.silver_customers_v2");
        assert_eq!(
            record.artifact_uri,
            "github://unknown/actions/runs/unknown#mlops-artifacts"
        );
        assert_eq!(record.metrics["accuracy"], 0.9);
        assert_eq!(record.metrics["rows"], 100.0);
    }

    #[test]
    fn test_register_reads_metrics_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = pipeline(&temp_dir);
        write_metrics(&pipeline, 0.85, 0.78);

        let record = pipeline.register().unwrap();

        assert_eq!(record.metrics["f1"], 0.78);
        assert!(record.model_version.ends_with("-abc1234"));
    }

    #[test]
    fn test_run_reports_failing_stage() {
        let temp_dir = TempDir::new().unwrap();
        let err = pipeline(&temp_dir).run().unwrap_err();

        assert_eq!(err.stage, Stage::Validate);
        assert_eq!(err.kind(), ErrorKind::InputNotFound);
        assert!(err.to_string().starts_with("validate stage failed"));
    }
}
