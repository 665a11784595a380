//! DataOps Core - quality checks, quality gate and model registry for a
//! small data/ML pipeline.
//!
//! The pipeline validates a silver table, trains a classifier on it, gates the
//! resulting metrics and registers and promotes the model. All state lives in
//! a SQLite warehouse that several processes may share.
//!
//! # Example
//!
//! ```rust,ignore
//! use dataops_core::{Pipeline, PipelineConfig, PipelineOutcome};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::from_env()?;
//!     let pipeline = Pipeline::open(config)?;
//!
//!     match pipeline.run()?.outcome {
//!         PipelineOutcome::Promoted(record) => println!("PROD: {}", record.model_version),
//!         PipelineOutcome::Rejected(decision) => println!("rejected: {:?}", decision.failures),
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod quality;
pub mod registry;
pub mod timestamp;
pub mod training;
pub mod warehouse;

// Re-export commonly used types
pub use config::{PipelineConfig, Provenance, TablesConfig, WarehouseConfig};
pub use error::{DataOpsError, ErrorKind, Result};
pub use gate::{GateDecision, GateFailure, GateThresholds, QualityGate, Verdict};
pub use pipeline::{Pipeline, PipelineOutcome, PipelineReport, Stage, StageError};
pub use quality::{CheckKind, QualityCheckResult, QualityRecorder, Severity, ValidationReport};
pub use registry::{ModelRegistry, ModelStatus, ModelVersionRecord, NewModelVersion};
pub use training::{ArtifactDir, MetricsArtifact, Trainer, TrainingOutcome};
pub use warehouse::{TableName, Warehouse};
