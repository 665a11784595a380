//! Centralized configuration for the DataOps pipeline.
//!
//! Configuration is read once at process start into a [`PipelineConfig`] and
//! passed by reference to each stage. Nothing below this module looks at the
//! process environment.

use crate::gate::GateThresholds;
use crate::warehouse::TableName;
use crate::{DataOpsError, Result};
use serde::Serialize;
use std::path::PathBuf;

/// Environment variable names understood by [`PipelineConfig::from_env`].
pub struct EnvVars;

impl EnvVars {
    pub const WAREHOUSE: &'static str = "DATAOPS_WAREHOUSE";
    pub const MODEL_NAME: &'static str = "MODEL_NAME";
    pub const REGISTRY_TABLE: &'static str = "REGISTRY_TABLE";
    pub const SILVER_TABLE: &'static str = "SILVER_TABLE";
    pub const DQ_RESULTS_TABLE: &'static str = "DQ_RESULTS_TABLE";
    pub const RUN_ID: &'static str = "RUN_ID";
    pub const GIT_SHA: &'static str = "GIT_SHA";
    pub const REPOSITORY: &'static str = "GITHUB_REPOSITORY";
    pub const CI_RUN_ID: &'static str = "GITHUB_RUN_ID";
    pub const ARTIFACT_DIR: &'static str = "ARTIFACT_DIR";
    pub const MIN_ACCURACY: &'static str = "MIN_ACCURACY";
    pub const MIN_F1: &'static str = "MIN_F1";
}

/// Defaults applied when an optional variable is unset or blank.
pub struct Defaults;

impl Defaults {
    pub const MODEL_NAME: &'static str = "customer_risk";
    pub const REGISTRY_TABLE: &'static str = "dataops.model_registry";
    pub const SILVER_TABLE: &'static str = "dataops.silver_customers_v2";
    pub const DQ_RESULTS_TABLE: &'static str = "dataops.ops_dq_results";
    pub const UNKNOWN: &'static str = "unknown";
    pub const ARTIFACT_DIR: &'static str = "framework/mlops/artifacts";
    pub const MANUAL_RUN_PREFIX: &'static str = "manual";
}

/// Warehouse connection settings.
#[derive(Debug, Clone, Serialize)]
pub struct WarehouseConfig {
    pub path: PathBuf,
}

impl WarehouseConfig {
    /// How long a writer waits on a locked database before failing.
    pub const BUSY_TIMEOUT_MS: u64 = 30_000;
}

/// Table identifiers used by the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct TablesConfig {
    pub registry: TableName,
    pub silver: TableName,
    pub dq_results: TableName,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            registry: TableName::parse(Defaults::REGISTRY_TABLE)
                .expect("default registry table is a valid identifier"),
            silver: TableName::parse(Defaults::SILVER_TABLE)
                .expect("default silver table is a valid identifier"),
            dq_results: TableName::parse(Defaults::DQ_RESULTS_TABLE)
                .expect("default results table is a valid identifier"),
        }
    }
}

/// Where a build came from.
#[derive(Debug, Clone, Serialize)]
pub struct Provenance {
    /// Source revision (git SHA) that produced the model.
    pub source_revision: String,
    pub repository: String,
    /// CI run that built the artifacts.
    pub ci_run_id: String,
}

impl Default for Provenance {
    fn default() -> Self {
        Self {
            source_revision: Defaults::UNKNOWN.to_string(),
            repository: Defaults::UNKNOWN.to_string(),
            ci_run_id: Defaults::UNKNOWN.to_string(),
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub warehouse: WarehouseConfig,
    pub model_name: String,
    pub tables: TablesConfig,
    /// Correlation id stamped on every quality check row of this run.
    pub run_id: String,
    pub provenance: Provenance,
    pub artifact_dir: PathBuf,
    pub thresholds: GateThresholds,
}

impl PipelineConfig {
    /// Configuration with defaults for everything except the warehouse path.
    pub fn new(warehouse_path: impl Into<PathBuf>) -> Self {
        Self {
            warehouse: WarehouseConfig {
                path: warehouse_path.into(),
            },
            model_name: Defaults::MODEL_NAME.to_string(),
            tables: TablesConfig::default(),
            run_id: manual_run_id(),
            provenance: Provenance::default(),
            artifact_dir: PathBuf::from(Defaults::ARTIFACT_DIR),
            thresholds: GateThresholds::default(),
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Blank values count as unset. Fails before any I/O on a missing
    /// warehouse, an invalid table identifier or an unusable threshold.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let warehouse_path = get(EnvVars::WAREHOUSE)
            .ok_or_else(|| DataOpsError::MissingVariable(EnvVars::WAREHOUSE.to_string()))?;

        let tables = TablesConfig {
            registry: TableName::parse(&get_or(EnvVars::REGISTRY_TABLE, Defaults::REGISTRY_TABLE))?,
            silver: TableName::parse(&get_or(EnvVars::SILVER_TABLE, Defaults::SILVER_TABLE))?,
            dq_results: TableName::parse(&get_or(
                EnvVars::DQ_RESULTS_TABLE,
                Defaults::DQ_RESULTS_TABLE,
            ))?,
        };

        let defaults = GateThresholds::default();
        let thresholds = GateThresholds::new(
            parse_threshold(EnvVars::MIN_ACCURACY, get(EnvVars::MIN_ACCURACY), defaults.min_accuracy)?,
            parse_threshold(EnvVars::MIN_F1, get(EnvVars::MIN_F1), defaults.min_f1)?,
        )?;

        Ok(Self {
            warehouse: WarehouseConfig {
                path: PathBuf::from(warehouse_path),
            },
            model_name: get_or(EnvVars::MODEL_NAME, Defaults::MODEL_NAME),
            tables,
            run_id: get(EnvVars::RUN_ID).unwrap_or_else(manual_run_id),
            provenance: Provenance {
                source_revision: get_or(EnvVars::GIT_SHA, Defaults::UNKNOWN),
                repository: get_or(EnvVars::REPOSITORY, Defaults::UNKNOWN),
                ci_run_id: get_or(EnvVars::CI_RUN_ID, Defaults::UNKNOWN),
            },
            artifact_dir: PathBuf::from(get_or(EnvVars::ARTIFACT_DIR, Defaults::ARTIFACT_DIR)),
            thresholds,
        })
    }

    /// Logical locator of the CI artifacts for this build.
    pub fn artifact_uri(&self) -> String {
        format!(
            "github://{}/actions/runs/{}#mlops-artifacts",
            self.provenance.repository, self.provenance.ci_run_id
        )
    }
}

fn manual_run_id() -> String {
    format!(
        "{}-{}",
        Defaults::MANUAL_RUN_PREFIX,
        uuid::Uuid::new_v4().simple()
    )
}

fn parse_threshold(key: &str, raw: Option<String>, default: f64) -> Result<f64> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse::<f64>().map_err(|e| {
            DataOpsError::config(format!("{key} must be a number, got {value:?}: {e}"))
        }),
    }
}
