//! Training artifacts on disk.
//!
//! The artifact directory is the hand-off between training, the gate and
//! registration. Files are written atomically: serialize to a uniquely named
//! temp file in the same directory, sync, then rename over the target.

use super::logistic::LogisticRegression;
use super::metrics::MetricsArtifact;
use crate::{DataOpsError, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const METRICS_FILE: &str = "metrics.json";
pub const MODEL_FILE: &str = "model.json";
pub const SCHEMA_FILE: &str = "schema.json";
pub const RUN_METADATA_FILE: &str = "run_metadata.json";

/// Feature/label description of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub features: Vec<String>,
    pub label: String,
    pub source: String,
}

/// Who trained the model and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub model_name: String,
    pub source_revision: String,
    pub created_at_utc: String,
}

/// The artifact directory of one training run.
#[derive(Debug, Clone)]
pub struct ArtifactDir {
    root: PathBuf,
}

impl ArtifactDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.root.join(METRICS_FILE)
    }

    pub fn write_metrics(&self, metrics: &MetricsArtifact) -> Result<()> {
        write_json_atomic(&self.metrics_path(), metrics)
    }

    pub fn write_model(&self, model: &LogisticRegression) -> Result<()> {
        write_json_atomic(&self.root.join(MODEL_FILE), model)
    }

    pub fn write_schema(&self, schema: &ModelSchema) -> Result<()> {
        write_json_atomic(&self.root.join(SCHEMA_FILE), schema)
    }

    pub fn write_run_metadata(&self, metadata: &RunMetadata) -> Result<()> {
        write_json_atomic(&self.root.join(RUN_METADATA_FILE), metadata)
    }

    /// Load the metrics artifact; a missing file is an input-not-found error.
    pub fn load_metrics(&self) -> Result<MetricsArtifact> {
        let path = self.metrics_path();
        read_json(&path)?.ok_or_else(|| DataOpsError::InputNotFound {
            what: "metrics artifact".to_string(),
            location: path.display().to_string(),
        })
    }

    pub fn load_model(&self) -> Result<Option<LogisticRegression>> {
        read_json(&self.root.join(MODEL_FILE))
    }
}

/// Read and parse a JSON file, `None` if it does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(DataOpsError::io_with_path(e, path)),
    };

    let data = serde_json::from_str(&contents).map_err(|e| DataOpsError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;
    Ok(Some(data))
}

/// Write `data` as pretty JSON to `path` atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| DataOpsError::Io {
                message: format!("Failed to create directory {}", parent.display()),
                path: Some(parent.to_path_buf()),
                source: Some(e),
            })?;
        }
    }

    let serialized = serde_json::to_string_pretty(data).map_err(|e| DataOpsError::Json {
        message: format!("Failed to serialize {}: {}", path.display(), e),
        source: Some(e),
    })?;

    let temp_path = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .map_err(|e| DataOpsError::io_with_path(e, &temp_path))?;
        file.write_all(serialized.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| DataOpsError::io_with_path(e, &temp_path))?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(DataOpsError::Io {
            message: format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            ),
            path: Some(path.to_path_buf()),
            source: Some(e),
        });
    }

    debug!("Atomically wrote {}", path.display());
    Ok(())
}
