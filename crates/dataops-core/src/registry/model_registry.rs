//! Warehouse-backed model registry.

use super::types::{ModelStatus, ModelVersionRecord, NewModelVersion};
use crate::warehouse::{TableName, Warehouse};
use crate::{timestamp, DataOpsError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const RECORD_COLUMNS: &str = "model_name, model_version, created_at, source_revision, \
                              data_source, metrics_json, artifact_uri, status";

/// Model registry over a single registry table.
///
/// Rows are append-only apart from `status`. The table itself enforces the
/// lifecycle: a partial unique index allows one `PROD` row per model name and
/// triggers reject column rewrites, illegal status changes and deletes.
/// Promotion runs inside a `BEGIN IMMEDIATE` transaction, which takes the
/// database write lock up front and so serializes promotions across processes.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    warehouse: Warehouse,
    table: TableName,
}

impl ModelRegistry {
    /// Open the registry stored in `table`, creating it if needed.
    pub fn open(warehouse: &Warehouse, table: TableName) -> Result<Self> {
        let registry = Self {
            warehouse: warehouse.clone(),
            table,
        };
        registry.ensure_schema()?;
        Ok(registry)
    }

    fn ensure_schema(&self) -> Result<()> {
        let table = self.table.quoted();
        self.warehouse.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                model_name TEXT NOT NULL,
                model_version TEXT NOT NULL,
                created_at TEXT NOT NULL,
                source_revision TEXT NOT NULL,
                data_source TEXT NOT NULL,
                metrics_json TEXT NOT NULL,
                artifact_uri TEXT NOT NULL,
                status TEXT NOT NULL CHECK (status IN ('REGISTERED', 'PROD', 'ARCHIVED')),
                PRIMARY KEY (model_name, model_version)
            );

            CREATE UNIQUE INDEX IF NOT EXISTS {one_prod}
                ON {table}(model_name) WHERE status = 'PROD';

            CREATE INDEX IF NOT EXISTS {by_status}
                ON {table}(model_name, status, created_at);

            CREATE TRIGGER IF NOT EXISTS {registered_on_insert} BEFORE INSERT ON {table}
            WHEN NEW.status <> 'REGISTERED'
            BEGIN
                SELECT RAISE(ABORT, 'model versions must be inserted as REGISTERED');
            END;

            CREATE TRIGGER IF NOT EXISTS {immutable} BEFORE UPDATE OF
                model_name, model_version, created_at, source_revision,
                data_source, metrics_json, artifact_uri ON {table}
            BEGIN
                SELECT RAISE(ABORT, 'model version rows are immutable except status');
            END;

            CREATE TRIGGER IF NOT EXISTS {transitions} BEFORE UPDATE OF status ON {table}
            WHEN NOT ((OLD.status = 'REGISTERED' AND NEW.status = 'PROD')
                   OR (OLD.status = 'PROD' AND NEW.status = 'ARCHIVED'))
            BEGIN
                SELECT RAISE(ABORT, 'illegal model status transition');
            END;

            CREATE TRIGGER IF NOT EXISTS {no_delete} BEFORE DELETE ON {table}
            BEGIN
                SELECT RAISE(ABORT, 'model versions are never deleted');
            END;",
            one_prod = self.table.derived("one_prod"),
            by_status = self.table.derived("by_status"),
            registered_on_insert = self.table.derived("registered_on_insert"),
            immutable = self.table.derived("immutable"),
            transitions = self.table.derived("transitions"),
            no_delete = self.table.derived("no_delete"),
        ))
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    // ========================================
    // Registration
    // ========================================

    /// Register a new model version with status `REGISTERED`.
    ///
    /// Fails with [`DataOpsError::VersionExists`] if the version is already
    /// registered for this model; the existing row is left untouched.
    pub fn register(&self, new: &NewModelVersion) -> Result<ModelVersionRecord> {
        self.register_at(new, Utc::now())
    }

    /// Register with an explicit creation time, for imports and backfills.
    pub fn register_at(
        &self,
        new: &NewModelVersion,
        created_at: DateTime<Utc>,
    ) -> Result<ModelVersionRecord> {
        new.validate()?;

        let record = ModelVersionRecord {
            model_name: new.model_name.clone(),
            model_version: new.model_version.clone(),
            created_at: timestamp::format(created_at),
            source_revision: new.source_revision.clone(),
            data_source: new.data_source.clone(),
            metrics: new.metrics.clone(),
            artifact_uri: new.artifact_uri.clone(),
            status: ModelStatus::Registered,
        };
        let metrics_json = serde_json::to_string(&record.metrics)?;

        let conn = self.warehouse.lock_conn()?;
        let inserted = conn.execute(
            &format!(
                "INSERT INTO {} ({RECORD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                self.table.quoted()
            ),
            params![
                record.model_name,
                record.model_version,
                record.created_at,
                record.source_revision,
                record.data_source,
                metrics_json,
                record.artifact_uri,
                record.status,
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
                    && matches!(
                        err.extended_code,
                        rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                            | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    ) =>
            {
                warn!(
                    "Refusing to re-register {} {}",
                    record.model_name, record.model_version
                );
                return Err(DataOpsError::VersionExists {
                    model_name: record.model_name,
                    model_version: record.model_version,
                });
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            "Registered model {} version {}",
            record.model_name, record.model_version
        );
        Ok(record)
    }

    // ========================================
    // Promotion
    // ========================================

    /// Promote the newest `REGISTERED` version of `model_name` to `PROD`.
    ///
    /// The candidate is the `REGISTERED` row with the greatest
    /// `(created_at, model_version)`. When a `PROD` row exists the candidate
    /// must be newer than it; registrations older than the current production
    /// version are stale and never promoted. The current `PROD` row is archived
    /// and the candidate promoted in one transaction, archive first, so no
    /// reader ever sees two `PROD` rows.
    ///
    /// Fails with [`DataOpsError::NoPromotionCandidate`] without changing
    /// anything when there is nothing to promote. A run that died between the
    /// two updates (only possible against a store without transactions) leaves
    /// zero `PROD` rows and a `REGISTERED` candidate, which this call completes.
    pub fn promote(&self, model_name: &str) -> Result<ModelVersionRecord> {
        let mut conn = self.warehouse.lock_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = self.fetch_one(
            &tx,
            "WHERE model_name = ?1 AND status = 'PROD'
             ORDER BY created_at DESC, model_version DESC LIMIT 1",
            model_name,
        )?;
        let latest = self.fetch_one(
            &tx,
            "WHERE model_name = ?1 AND status = 'REGISTERED'
             ORDER BY created_at DESC, model_version DESC LIMIT 1",
            model_name,
        )?;

        let candidate = match (latest, &current) {
            (Some(latest), Some(prod)) if latest.is_newer_than(prod) => latest,
            (Some(latest), None) => latest,
            (Some(stale), Some(prod)) => {
                debug!(
                    "Latest REGISTERED {} is older than PROD {}",
                    stale.model_version, prod.model_version
                );
                return Err(DataOpsError::NoPromotionCandidate {
                    model_name: model_name.to_string(),
                });
            }
            (None, _) => {
                return Err(DataOpsError::NoPromotionCandidate {
                    model_name: model_name.to_string(),
                })
            }
        };

        if candidate.metrics.is_empty() {
            return Err(DataOpsError::EmptyMetrics {
                model_name: candidate.model_name,
                model_version: candidate.model_version,
            });
        }

        let transitions = [
            (Some(&candidate), ModelStatus::Prod),
            (current.as_ref(), ModelStatus::Archived),
        ];
        for (record, next) in transitions {
            if let Some(record) = record.filter(|r| !r.status.can_transition_to(next)) {
                return Err(DataOpsError::IllegalTransition {
                    model_version: record.model_version.clone(),
                    from: record.status.to_string(),
                    to: next.to_string(),
                });
            }
        }

        if current.is_none() {
            debug!("No PROD version for {}, promoting directly", model_name);
        }

        let archived = tx.execute(
            &format!(
                "UPDATE {} SET status = ?1 WHERE model_name = ?2 AND status = ?3",
                self.table.quoted()
            ),
            params![ModelStatus::Archived, model_name, ModelStatus::Prod],
        )?;

        let promoted = tx.execute(
            &format!(
                "UPDATE {} SET status = ?1
                 WHERE model_name = ?2 AND model_version = ?3 AND status = ?4",
                self.table.quoted()
            ),
            params![
                ModelStatus::Prod,
                model_name,
                candidate.model_version,
                ModelStatus::Registered
            ],
        )?;
        if promoted != 1 {
            return Err(DataOpsError::IllegalTransition {
                model_version: candidate.model_version,
                from: ModelStatus::Registered.to_string(),
                to: ModelStatus::Prod.to_string(),
            });
        }

        tx.commit()?;

        info!(
            "Promoted {} {} to PROD (archived {})",
            model_name, candidate.model_version, archived
        );
        Ok(ModelVersionRecord {
            status: ModelStatus::Prod,
            ..candidate
        })
    }

    // ========================================
    // Queries
    // ========================================

    /// The current production version of `model_name`, if any.
    pub fn current(&self, model_name: &str) -> Result<Option<ModelVersionRecord>> {
        let conn = self.warehouse.lock_conn()?;
        self.fetch_one(
            &conn,
            "WHERE model_name = ?1 AND status = 'PROD'
             ORDER BY created_at DESC, model_version DESC LIMIT 1",
            model_name,
        )
    }

    /// A single version of `model_name`.
    pub fn get(&self, model_name: &str, model_version: &str) -> Result<Option<ModelVersionRecord>> {
        let conn = self.warehouse.lock_conn()?;
        let result = conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM {} WHERE model_name = ?1 AND model_version = ?2",
                    self.table.quoted()
                ),
                params![model_name, model_version],
                Self::row_to_record,
            )
            .optional()?;
        Ok(result)
    }

    /// Every version of `model_name`, newest registration first.
    pub fn list(&self, model_name: &str) -> Result<Vec<ModelVersionRecord>> {
        let conn = self.warehouse.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM {} WHERE model_name = ?1
             ORDER BY created_at DESC, model_version DESC",
            self.table.quoted()
        ))?;

        let rows = stmt.query_map(params![model_name], Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn fetch_one(
        &self,
        conn: &Connection,
        clause: &str,
        model_name: &str,
    ) -> Result<Option<ModelVersionRecord>> {
        let result = conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM {} {clause}",
                    self.table.quoted()
                ),
                params![model_name],
                Self::row_to_record,
            )
            .optional()?;
        Ok(result)
    }

    fn row_to_record(row: &Row) -> rusqlite::Result<ModelVersionRecord> {
        let metrics_json: String = row.get(5)?;
        let metrics: BTreeMap<String, f64> = serde_json::from_str(&metrics_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(ModelVersionRecord {
            model_name: row.get(0)?,
            model_version: row.get(1)?,
            created_at: row.get(2)?,
            source_revision: row.get(3)?,
            data_source: row.get(4)?,
            metrics,
            artifact_uri: row.get(6)?,
            status: row.get(7)?,
        })
    }
}
