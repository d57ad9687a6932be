//! Relational store handle for analysis results and converted records
//!
//! The [`StoreHandle`] owns the root DuckDB connection and the coarse write
//! lock that serializes every check-then-insert sequence. Workers never share
//! a connection: each one checks a [`WorkerContext`] out of the
//! [`SessionPool`] and gets its own cloned connection.

mod error;
pub mod schema;
mod session;

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

pub use error::StoreError;
pub use schema::{ANCHOR_TABLE, ARTIFACT_TABLE, CORE_TABLES, RESULT_TABLE, StoreSchema};
pub use session::{Session, SessionPool, WorkerContext, WorkerId};

/// Handle to the target store, constructed once at startup
pub struct StoreHandle {
    root: Mutex<Option<duckdb::Connection>>,
    write_lock: Mutex<()>,
    target: String,
}

impl StoreHandle {
    /// Open or create a store at the given path
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = duckdb::Connection::open(path).map_err(|e| StoreError::Connection {
            target: path.to_string(),
            reason: e.to_string(),
        })?;
        info!(target = path, "Opened store");
        Ok(Self::from_connection(conn, path))
    }

    /// Open an in-memory store (for testing)
    pub fn memory() -> Result<Self, StoreError> {
        let conn = duckdb::Connection::open_in_memory().map_err(|e| StoreError::Connection {
            target: ":memory:".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_connection(conn, ":memory:"))
    }

    fn from_connection(conn: duckdb::Connection, target: &str) -> Self {
        Self {
            root: Mutex::new(Some(conn)),
            write_lock: Mutex::new(()),
            target: target.to_string(),
        }
    }

    /// Get the connection target (file path or `:memory:`)
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Open a new connection to the same database
    pub fn connect(&self) -> Result<duckdb::Connection, StoreError> {
        let root = self.root.lock().map_err(|_| StoreError::LockPoisoned)?;
        let conn = root.as_ref().ok_or(StoreError::Disposed)?;
        Ok(conn.try_clone()?)
    }

    /// Acquire the coarse write lock
    ///
    /// Hold the returned guard across any read-then-decide-then-write
    /// sequence (dedup checks, anchor lookup-or-create, table creation).
    pub fn lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Run statements on the root connection while holding the write lock
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        self.with_root(|conn| Ok(conn.execute_batch(sql)?))
    }

    fn with_root<T>(
        &self,
        f: impl FnOnce(&duckdb::Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let root = self.root.lock().map_err(|_| StoreError::LockPoisoned)?;
        let conn = root.as_ref().ok_or(StoreError::Disposed)?;
        f(conn)
    }

    /// Check whether a table exists
    pub fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        self.with_root(|conn| table_exists(conn, table))
    }

    /// Make sure the core tables exist, optionally dropping them first
    pub fn ensure_tables(&self, drop_existing: bool) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        self.with_root(|conn| {
            if drop_existing {
                warn!(tables = ?CORE_TABLES, "Dropping and recreating tables");
                conn.execute_batch(StoreSchema::drop_tables())?;
            }

            let mut missing = Vec::new();
            for table in CORE_TABLES {
                if !table_exists(conn, table)? {
                    missing.push(table);
                }
            }
            if !missing.is_empty() {
                info!(tables = ?missing, "Creating tables");
                conn.execute_batch(StoreSchema::create_tables())?;
            }
            Ok(())
        })
    }

    /// Count the rows in a table
    pub fn row_count(&self, table: &str) -> Result<i64, StoreError> {
        self.with_root(|conn| {
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", quote_identifier(table)),
                [],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Release the root connection
    ///
    /// Call after the last worker has exited; connections already handed to
    /// sessions stay valid until those sessions are dropped.
    pub fn dispose(&self) -> Result<(), StoreError> {
        let mut root = self.root.lock().map_err(|_| StoreError::LockPoisoned)?;
        if root.take().is_some() {
            debug!(target = %self.target, "Disposed store");
        }
        Ok(())
    }
}

/// Check whether a table exists on the given connection
pub(crate) fn table_exists(conn: &duckdb::Connection, table: &str) -> Result<bool, StoreError> {
    let count: i64 = conn.query_row(StoreSchema::select_table_exists(), [table], |row| row.get(0))?;
    Ok(count > 0)
}

/// Quote an identifier, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_tables_creates_core_tables() {
        let store = StoreHandle::memory().unwrap();
        for table in CORE_TABLES {
            assert!(!store.table_exists(table).unwrap());
        }

        store.ensure_tables(false).unwrap();
        for table in CORE_TABLES {
            assert!(store.table_exists(table).unwrap());
        }
        assert_eq!(store.row_count(RESULT_TABLE).unwrap(), 0);
    }

    #[test]
    fn test_drop_existing_clears_rows() {
        let store = StoreHandle::memory().unwrap();
        store.ensure_tables(false).unwrap();
        store
            .execute_batch("INSERT INTO metadata_anchors (id, camera_tag) VALUES (1, '11_30_10')")
            .unwrap();
        assert_eq!(store.row_count(ANCHOR_TABLE).unwrap(), 1);

        store.ensure_tables(true).unwrap();
        assert_eq!(store.row_count(ANCHOR_TABLE).unwrap(), 0);
    }

    #[test]
    fn test_dispose_refuses_new_connections() {
        let store = StoreHandle::memory().unwrap();
        assert!(store.connect().is_ok());
        store.dispose().unwrap();
        assert!(matches!(store.connect(), Err(StoreError::Disposed)));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("glass_id"), "\"glass_id\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
