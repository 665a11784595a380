//! Model version records and their lifecycle status.

use crate::{DataOpsError, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status of a model version.
///
/// `Registered -> Prod -> Archived`. Promotion is the only way into `Prod`,
/// being superseded by a newer promotion is the only way into `Archived`, and
/// nothing leaves `Archived`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelStatus {
    Registered,
    Prod,
    Archived,
}

impl ModelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStatus::Registered => "REGISTERED",
            ModelStatus::Prod => "PROD",
            ModelStatus::Archived => "ARCHIVED",
        }
    }

    /// Parse the stored column value; matching is exact and case-sensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REGISTERED" => Some(ModelStatus::Registered),
            "PROD" => Some(ModelStatus::Prod),
            "ARCHIVED" => Some(ModelStatus::Archived),
            _ => None,
        }
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: ModelStatus) -> bool {
        matches!(
            (self, next),
            (ModelStatus::Registered, ModelStatus::Prod) | (ModelStatus::Prod, ModelStatus::Archived)
        )
    }
}

impl std::fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for ModelStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ModelStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        ModelStatus::parse(text).ok_or_else(|| {
            FromSqlError::Other(format!("unknown model status {text:?}").into())
        })
    }
}

/// Input to [`ModelRegistry::register`](super::ModelRegistry::register).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewModelVersion {
    pub model_name: String,
    pub model_version: String,
    pub metrics: BTreeMap<String, f64>,
    pub artifact_uri: String,
    pub source_revision: String,
    pub data_source: String,
}

impl NewModelVersion {
    /// Check the fields that must hold before anything is written.
    pub(crate) fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("model_name", &self.model_name),
            ("model_version", &self.model_version),
        ] {
            if value.trim().is_empty() {
                return Err(DataOpsError::Validation {
                    field: field.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }

        if self.metrics.is_empty() {
            return Err(DataOpsError::EmptyMetrics {
                model_name: self.model_name.clone(),
                model_version: self.model_version.clone(),
            });
        }

        if let Some((name, value)) = self.metrics.iter().find(|(_, v)| !v.is_finite()) {
            return Err(DataOpsError::Validation {
                field: format!("metrics.{name}"),
                message: format!("metric values must be finite, got {value}"),
            });
        }

        Ok(())
    }
}

/// One row of the model registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersionRecord {
    pub model_name: String,
    pub model_version: String,
    pub created_at: String,
    pub source_revision: String,
    pub data_source: String,
    pub metrics: BTreeMap<String, f64>,
    pub artifact_uri: String,
    pub status: ModelStatus,
}

impl ModelVersionRecord {
    /// Registration order: `created_at`, then version string as tie-break.
    pub fn is_newer_than(&self, other: &ModelVersionRecord) -> bool {
        (&self.created_at, &self.model_version) > (&other.created_at, &other.model_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(created_at: &str, version: &str) -> ModelVersionRecord {
        ModelVersionRecord {
            model_name: "risk".into(),
            model_version: version.into(),
            created_at: created_at.into(),
            source_revision: "abc1234".into(),
            data_source: "silver".into(),
            metrics: BTreeMap::from([("accuracy".to_string(), 0.9)]),
            artifact_uri: "file://model".into(),
            status: ModelStatus::Registered,
        }
    }

    #[test]
    fn test_transitions() {
        use ModelStatus::*;
        assert!(Registered.can_transition_to(Prod));
        assert!(Prod.can_transition_to(Archived));
        assert!(!Registered.can_transition_to(Archived));
        assert!(!Archived.can_transition_to(Prod));
        assert!(!Archived.can_transition_to(Registered));
        assert!(!Prod.can_transition_to(Registered));
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [ModelStatus::Registered, ModelStatus::Prod, ModelStatus::Archived] {
            assert_eq!(ModelStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ModelStatus::parse("prod"), None);
    }

    #[test]
    fn test_newer_uses_version_as_tie_break() {
        let a = record("2024-01-01T00:00:00.000000Z", "v20240101000000-aaaaaaa");
        let b = record("2024-01-01T00:00:00.000000Z", "v20240101000000-bbbbbbb");
        let c = record("2024-01-02T00:00:00.000000Z", "v20240102000000-0000000");
        assert!(b.is_newer_than(&a));
        assert!(!a.is_newer_than(&b));
        assert!(c.is_newer_than(&b));
        assert!(!a.is_newer_than(&a));
    }

    #[test]
    fn test_validate_rejects_empty_and_non_finite_metrics() {
        let mut new = NewModelVersion {
            model_name: "risk".into(),
            model_version: "v1".into(),
            metrics: BTreeMap::new(),
            artifact_uri: "file://model".into(),
            source_revision: "abc".into(),
            data_source: "silver".into(),
        };
        assert!(matches!(new.validate(), Err(DataOpsError::EmptyMetrics { .. })));

        new.metrics.insert("accuracy".into(), f64::NAN);
        assert!(matches!(new.validate(), Err(DataOpsError::Validation { .. })));

        new.metrics.insert("accuracy".into(), 0.9);
        assert!(new.validate().is_ok());

        new.model_version = " ".into();
        assert!(matches!(new.validate(), Err(DataOpsError::Validation { .. })));
    }
}
