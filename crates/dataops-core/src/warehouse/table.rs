//! Validated table identifiers.
//!
//! Table names are the only caller-supplied text ever spliced into SQL. They
//! pass a narrow allow-list and are double-quoted on output; row values always
//! go through bound parameters.

use crate::{DataOpsError, Result};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static TABLE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("table name regex must compile")
});

/// A table identifier such as `dataops.model_registry`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TableName(String);

impl TableName {
    /// Validate a raw identifier against the allow-list.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if !TABLE_NAME_RE.is_match(trimmed) {
            return Err(DataOpsError::InvalidIdentifier(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier quoted for use in SQL text.
    ///
    /// A dotted name becomes a single quoted identifier, so
    /// `dataops.model_registry` lives in the main schema under that full name.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// A quoted identifier for an object owned by this table (index, trigger).
    pub(crate) fn derived(&self, suffix: &str) -> String {
        format!("\"{}__{}\"", self.0, suffix)
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TableName {
    type Err = DataOpsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_and_schema_qualified_names() {
        assert!(TableName::parse("model_registry").is_ok());
        assert!(TableName::parse("dataops.silver_customers_v2").is_ok());
        assert_eq!(
            TableName::parse("dataops.ops_dq_results").unwrap().quoted(),
            "\"dataops.ops_dq_results\""
        );
    }

    #[test]
    fn test_rejects_injection_attempts() {
        for raw in [
            "",
            "registry; DROP TABLE x",
            "a.b.c",
            "1table",
            "name\"",
            "dataops.model registry",
            "t--",
        ] {
            assert!(
                matches!(TableName::parse(raw), Err(DataOpsError::InvalidIdentifier(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_derived_names_stay_quoted() {
        let table = TableName::parse("dataops.model_registry").unwrap();
        assert_eq!(table.derived("one_prod"), "\"dataops.model_registry__one_prod\"");
    }
}
