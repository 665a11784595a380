//! Data-quality checks over the silver layer.
//!
//! - `types` - severities, the check battery and its severity policy
//! - `recorder` - runs the checks and appends results to the warehouse

mod recorder;
mod types;

pub use recorder::QualityRecorder;
pub use types::{CheckKind, QualityCheckResult, Severity, ValidationReport};
