//! Relational warehouse access.
//!
//! The pipeline talks to a single relational store through connect/execute/fetch.
//! This module provides that store on top of SQLite: WAL mode and a busy timeout
//! let several pipeline processes share one database file, and an
//! `Arc<Mutex<Connection>>` keeps a handle safe to share between threads.

mod table;

pub use table::TableName;

use crate::config::WarehouseConfig;
use crate::{DataOpsError, Result};
use rusqlite::{Connection, Params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Handle to the warehouse database.
#[derive(Debug, Clone)]
pub struct Warehouse {
    db_path: Option<PathBuf>,
    conn: Arc<Mutex<Connection>>,
}

impl Warehouse {
    /// Open the warehouse at a specific path.
    ///
    /// Creates the database and parent directories if they don't exist.
    pub fn open_at(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| DataOpsError::Io {
                    message: format!(
                        "Failed to create warehouse directory: {}",
                        parent.display()
                    ),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        Self::configure_connection(&conn)?;
        debug!("Opened warehouse at {}", db_path.display());

        Ok(Self {
            db_path: Some(db_path.to_path_buf()),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open the warehouse described by the configuration.
    pub fn open(config: &WarehouseConfig) -> Result<Self> {
        Self::open_at(&config.path)
    }

    /// Open a private in-memory warehouse.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure_connection(&conn)?;

        Ok(Self {
            db_path: None,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "PRAGMA busy_timeout={};\n\
             PRAGMA journal_mode=WAL;\n\
             PRAGMA synchronous=NORMAL;\n\
             PRAGMA temp_store=MEMORY;",
            WarehouseConfig::BUSY_TIMEOUT_MS,
        ))?;
        Ok(())
    }

    /// Path of the backing database file, if any.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub(crate) fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DataOpsError::Database {
            message: "Failed to acquire warehouse connection lock".to_string(),
            source: None,
        })
    }

    /// Run a batch of statements with no parameters.
    ///
    /// Used for schema setup and prepared SQL scripts; never for row values.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Run a single-value `COUNT(*)` style query.
    pub fn fetch_count<P: Params>(&self, sql: &str, params: P) -> Result<u64> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row(sql, params, |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Whether a table with this identifier exists.
    pub fn table_exists(&self, table: &TableName) -> Result<bool> {
        let conn = self.lock_conn()?;
        let found: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table.as_str()],
            |row| row.get(0),
        )?;
        Ok(found > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("warehouse.db");

        let warehouse = Warehouse::open_at(&db_path).unwrap();

        assert!(db_path.exists());
        assert_eq!(warehouse.db_path(), Some(db_path.as_path()));
    }

    #[test]
    fn test_fetch_count_and_table_exists() {
        let warehouse = Warehouse::open_in_memory().unwrap();
        let table = TableName::parse("dataops.silver").unwrap();
        assert!(!warehouse.table_exists(&table).unwrap());

        warehouse
            .execute_batch(
                "CREATE TABLE \"dataops.silver\" (id INTEGER);
                 INSERT INTO \"dataops.silver\" VALUES (1), (2), (3);",
            )
            .unwrap();

        assert!(warehouse.table_exists(&table).unwrap());
        let count = warehouse
            .fetch_count("SELECT COUNT(*) FROM \"dataops.silver\" WHERE id > ?1", [1])
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_two_handles_share_one_file() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("shared.db");

        let first = Warehouse::open_at(&db_path).unwrap();
        let second = Warehouse::open_at(&db_path).unwrap();

        first
            .execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (7);")
            .unwrap();
        assert_eq!(second.fetch_count("SELECT COUNT(*) FROM t", []).unwrap(), 1);
    }
}
