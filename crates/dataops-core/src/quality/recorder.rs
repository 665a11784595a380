//! Records data-quality checks for a validation run.

use super::types::{CheckKind, QualityCheckResult, Severity, ValidationReport};
use crate::warehouse::{TableName, Warehouse};
use crate::{timestamp, DataOpsError, Result};
use rusqlite::params;
use tracing::{debug, info};

/// Append-only writer for quality check results.
#[derive(Debug, Clone)]
pub struct QualityRecorder {
    warehouse: Warehouse,
    results_table: TableName,
}

impl QualityRecorder {
    /// Open a recorder writing to `results_table`, creating it if needed.
    pub fn open(warehouse: &Warehouse, results_table: TableName) -> Result<Self> {
        let recorder = Self {
            warehouse: warehouse.clone(),
            results_table,
        };
        recorder.ensure_schema()?;
        Ok(recorder)
    }

    fn ensure_schema(&self) -> Result<()> {
        let table = self.results_table.quoted();
        self.warehouse.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                run_id TEXT NOT NULL,
                checked_at TEXT NOT NULL,
                target TEXT NOT NULL,
                check_name TEXT NOT NULL,
                severity TEXT NOT NULL CHECK (severity IN ('INFO', 'PASS', 'WARN', 'FAIL')),
                value REAL NOT NULL,
                detail TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS {run_idx} ON {table}(run_id);

            CREATE TRIGGER IF NOT EXISTS {no_update} BEFORE UPDATE ON {table}
            BEGIN
                SELECT RAISE(ABORT, 'quality check results are append-only');
            END;

            CREATE TRIGGER IF NOT EXISTS {no_delete} BEFORE DELETE ON {table}
            BEGIN
                SELECT RAISE(ABORT, 'quality check results are append-only');
            END;",
            run_idx = self.results_table.derived("run_idx"),
            no_update = self.results_table.derived("no_update"),
            no_delete = self.results_table.derived("no_delete"),
        ))
    }

    pub fn results_table(&self) -> &TableName {
        &self.results_table
    }

    /// Run every check against `target` and append one row per check.
    ///
    /// All measurements are taken before the first insert, so a failing query
    /// aborts the run without writing anything. Inserts are independent; if one
    /// fails, rows already written stay and the error is returned.
    pub fn record_run(&self, run_id: &str, target: &TableName) -> Result<ValidationReport> {
        if run_id.trim().is_empty() {
            return Err(DataOpsError::Validation {
                field: "run_id".to_string(),
                message: "run id must not be empty".to_string(),
            });
        }
        if !self.warehouse.table_exists(target)? {
            return Err(DataOpsError::InputNotFound {
                what: "dataset".to_string(),
                location: target.to_string(),
            });
        }

        info!("Validating table {} (run {})", target, run_id);
        let started_at = timestamp::now();

        let mut measured = Vec::with_capacity(CheckKind::ALL.len());
        for kind in CheckKind::ALL {
            measured.push((kind, self.measure(kind, target)?));
        }

        let mut results = Vec::with_capacity(measured.len());
        for (kind, count) in measured {
            let result = QualityCheckResult {
                run_id: run_id.to_string(),
                target: target.to_string(),
                check_name: kind.name().to_string(),
                severity: kind.severity_for(count),
                value: count as f64,
                detail: kind.detail(&started_at),
                checked_at: timestamp::now(),
            };
            self.insert(&result)?;
            debug!(
                "Recorded {} = {} ({})",
                result.check_name, count, result.severity
            );
            results.push(result);
        }

        let report = ValidationReport {
            run_id: run_id.to_string(),
            target: target.to_string(),
            results,
        };
        info!(
            "Validation completed for {}: worst severity {}",
            target,
            report.worst_severity().unwrap_or(Severity::Info)
        );
        Ok(report)
    }

    fn measure(&self, kind: CheckKind, target: &TableName) -> Result<u64> {
        match kind.flag_column() {
            None => self
                .warehouse
                .fetch_count(&format!("SELECT COUNT(*) FROM {}", target.quoted()), []),
            Some(column) => self.warehouse.fetch_count(
                &format!("SELECT COUNT(*) FROM {} WHERE {column} = ?1", target.quoted()),
                [true],
            ),
        }
    }

    fn insert(&self, result: &QualityCheckResult) -> Result<()> {
        let conn = self.warehouse.lock_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (run_id, checked_at, target, check_name, severity, value, detail)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                self.results_table.quoted()
            ),
            params![
                result.run_id,
                result.checked_at,
                result.target,
                result.check_name,
                result.severity.as_str(),
                result.value,
                result.detail,
            ],
        )?;
        Ok(())
    }

    /// Read back every result recorded under `run_id`, in insertion order.
    pub fn results_for_run(&self, run_id: &str) -> Result<Vec<QualityCheckResult>> {
        let conn = self.warehouse.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT run_id, checked_at, target, check_name, severity, value, detail
             FROM {} WHERE run_id = ?1 ORDER BY rowid",
            self.results_table.quoted()
        ))?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (run_id, checked_at, target, check_name, severity, value, detail) = row?;
            results.push(QualityCheckResult {
                run_id,
                target,
                check_name,
                severity: Severity::parse(&severity)?,
                value,
                detail,
                checked_at,
            });
        }
        Ok(results)
    }
}
