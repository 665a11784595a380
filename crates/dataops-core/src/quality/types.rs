//! Quality check result types and the per-check severity policy.

use crate::{DataOpsError, Result};
use serde::{Deserialize, Serialize};

/// Severity of a single quality check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Pass,
    Warn,
    Fail,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Pass => "PASS",
            Severity::Warn => "WARN",
            Severity::Fail => "FAIL",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "INFO" => Ok(Severity::Info),
            "PASS" => Ok(Severity::Pass),
            "WARN" => Ok(Severity::Warn),
            "FAIL" => Ok(Severity::Fail),
            other => Err(DataOpsError::Validation {
                field: "severity".to_string(),
                message: format!("unknown severity {other:?}"),
            }),
        }
    }

    /// How bad the result is; informational and passing results rank equal.
    fn rank(&self) -> u8 {
        match self {
            Severity::Info | Severity::Pass => 0,
            Severity::Warn => 1,
            Severity::Fail => 2,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The fixed battery of checks run against a silver table.
///
/// Each kind owns its severity policy. New kinds may be added; the policy of
/// existing kinds must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    /// Total number of rows. Always informational.
    TotalRows,
    /// Rows whose identifying name is null or blank. Any is a hard failure.
    NameNullCount,
    /// Rows describing someone under 18. Any is a soft warning.
    UnderageCount,
}

impl CheckKind {
    pub const ALL: [CheckKind; 3] = [
        CheckKind::TotalRows,
        CheckKind::NameNullCount,
        CheckKind::UnderageCount,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CheckKind::TotalRows => "total_rows",
            CheckKind::NameNullCount => "name_null_count",
            CheckKind::UnderageCount => "underage_count",
        }
    }

    /// Flag column counted by this check, `None` for a plain row count.
    pub(crate) fn flag_column(&self) -> Option<&'static str> {
        match self {
            CheckKind::TotalRows => None,
            CheckKind::NameNullCount => Some("dq_is_name_null"),
            CheckKind::UnderageCount => Some("dq_is_underage"),
        }
    }

    pub fn severity_for(&self, count: u64) -> Severity {
        match self {
            CheckKind::TotalRows => Severity::Info,
            CheckKind::NameNullCount if count > 0 => Severity::Fail,
            CheckKind::UnderageCount if count > 0 => Severity::Warn,
            CheckKind::NameNullCount | CheckKind::UnderageCount => Severity::Pass,
        }
    }

    pub(crate) fn detail(&self, checked_at: &str) -> String {
        match self {
            CheckKind::TotalRows => format!("checked_at={checked_at}"),
            CheckKind::NameNullCount => "name is null/empty".to_string(),
            CheckKind::UnderageCount => "age < 18".to_string(),
        }
    }
}

/// One persisted quality check row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCheckResult {
    pub run_id: String,
    pub target: String,
    pub check_name: String,
    pub severity: Severity,
    pub value: f64,
    pub detail: String,
    pub checked_at: String,
}

/// Everything a validation run recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub run_id: String,
    pub target: String,
    pub results: Vec<QualityCheckResult>,
}

impl ValidationReport {
    /// Most severe result of the run, if any results were recorded.
    pub fn worst_severity(&self) -> Option<Severity> {
        self.results
            .iter()
            .map(|r| r.severity)
            .max_by_key(|s| s.rank())
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.severity == Severity::Fail)
    }

    /// Look up the result for one check by name.
    pub fn result(&self, check_name: &str) -> Option<&QualityCheckResult> {
        self.results.iter().find(|r| r.check_name == check_name)
    }

    /// Value of the `total_rows` check, if recorded.
    pub fn total_rows(&self) -> Option<u64> {
        self.result(CheckKind::TotalRows.name())
            .map(|r| r.value as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_policy_per_check() {
        assert_eq!(CheckKind::TotalRows.severity_for(0), Severity::Info);
        assert_eq!(CheckKind::TotalRows.severity_for(1_000), Severity::Info);
        assert_eq!(CheckKind::NameNullCount.severity_for(0), Severity::Pass);
        assert_eq!(CheckKind::NameNullCount.severity_for(1), Severity::Fail);
        assert_eq!(CheckKind::UnderageCount.severity_for(0), Severity::Pass);
        assert_eq!(CheckKind::UnderageCount.severity_for(3), Severity::Warn);
    }

    #[test]
    fn test_severity_parse() {
        for severity in [Severity::Info, Severity::Pass, Severity::Warn, Severity::Fail] {
            assert_eq!(Severity::parse(severity.as_str()).unwrap(), severity);
        }
        assert!(Severity::parse("fail").is_err());
    }

    #[test]
    fn test_worst_severity() {
        let result = |name: &str, severity| QualityCheckResult {
            run_id: "r1".into(),
            target: "silver".into(),
            check_name: name.into(),
            severity,
            value: 0.0,
            detail: String::new(),
            checked_at: String::new(),
        };
        let report = ValidationReport {
            run_id: "r1".into(),
            target: "silver".into(),
            results: vec![
                result("total_rows", Severity::Info),
                result("underage_count", Severity::Warn),
                result("name_null_count", Severity::Pass),
            ],
        };
        assert_eq!(report.worst_severity(), Some(Severity::Warn));
        assert!(!report.has_failures());
    }
}
