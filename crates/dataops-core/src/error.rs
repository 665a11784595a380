//! Error types for the DataOps core.
//!
//! Every fatal condition a pipeline stage can hit maps to one variant here so
//! the binary can print a distinguishable cause before exiting. A quality gate
//! rejection is deliberately absent: it is a normal outcome, not an error.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the DataOps core.
#[derive(Debug, Error)]
pub enum DataOpsError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid table identifier: {0}")]
    InvalidIdentifier(String),

    // Missing inputs
    #[error("Input not found: {what} at {location}")]
    InputNotFound { what: String, location: String },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("No rows in {table} to train on")]
    EmptyDataset { table: String },

    // Registry errors
    #[error("Model version already registered: {model_name} {model_version}")]
    VersionExists {
        model_name: String,
        model_version: String,
    },

    #[error("Metrics must not be empty for {model_name} {model_version}")]
    EmptyMetrics {
        model_name: String,
        model_version: String,
    },

    #[error("No REGISTERED candidate to promote for {model_name}")]
    NoPromotionCandidate { model_name: String },

    #[error("Illegal status transition for {model_version}: {from} -> {to}")]
    IllegalTransition {
        model_version: String,
        from: String,
        to: String,
    },

    // Collaborator errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

/// Result type alias for DataOps operations.
pub type Result<T> = std::result::Result<T, DataOpsError>;

/// Coarse classification of an error, used for exit reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    InputNotFound,
    Validation,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::InputNotFound => "input-not-found",
            ErrorKind::Validation => "validation",
            ErrorKind::Storage => "storage",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<std::io::Error> for DataOpsError {
    fn from(err: std::io::Error) -> Self {
        DataOpsError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for DataOpsError {
    fn from(err: serde_json::Error) -> Self {
        DataOpsError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for DataOpsError {
    fn from(err: rusqlite::Error) -> Self {
        DataOpsError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl DataOpsError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        DataOpsError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        DataOpsError::Config {
            message: message.into(),
        }
    }

    /// Classify the error into one of the pipeline error families.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DataOpsError::Config { .. }
            | DataOpsError::MissingVariable(_)
            | DataOpsError::InvalidIdentifier(_) => ErrorKind::Configuration,

            DataOpsError::InputNotFound { .. } => ErrorKind::InputNotFound,

            DataOpsError::Validation { .. }
            | DataOpsError::EmptyDataset { .. }
            | DataOpsError::VersionExists { .. }
            | DataOpsError::EmptyMetrics { .. }
            | DataOpsError::NoPromotionCandidate { .. }
            | DataOpsError::IllegalTransition { .. } => ErrorKind::Validation,

            DataOpsError::Database { .. } | DataOpsError::Io { .. } | DataOpsError::Json { .. } => {
                ErrorKind::Storage
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DataOpsError::NoPromotionCandidate {
            model_name: "risk".into(),
        };
        assert_eq!(err.to_string(), "No REGISTERED candidate to promote for risk");
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        assert_eq!(
            DataOpsError::MissingVariable("DATAOPS_WAREHOUSE".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            DataOpsError::EmptyDataset {
                table: "silver".into()
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            DataOpsError::InputNotFound {
                what: "metrics".into(),
                location: "metrics.json".into(),
            }
            .kind(),
            ErrorKind::InputNotFound
        );
    }

    #[test]
    fn test_sqlite_error_maps_to_storage() {
        let err: DataOpsError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
