//! The SQLite file behind the document mirror.
//!
//! One connection guarded by a mutex. File databases run in WAL mode with a
//! busy timeout, so a `policydesk chat` session and a one-shot `policydesk docs`
//! command can share the same mirror.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, info};

use policydesk_core::error::PolicyDeskError;

use crate::migrations;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite handle holding the `kv_store` table.
pub struct Database {
    conn: Mutex<Connection>,
    location: Option<PathBuf>,
}

impl Database {
    /// Open (or create) the database file, creating parent directories.
    pub fn new(path: &Path) -> Result<Self, PolicyDeskError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|e| {
            PolicyDeskError::Storage(format!("Failed to open {}: {}", path.display(), e))
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| PolicyDeskError::Storage(format!("Failed to set busy timeout: {}", e)))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| PolicyDeskError::Storage(format!("Failed to set pragmas: {}", e)))?;

        let db = Self::init(conn, Some(path.to_path_buf()))?;
        info!(path = %path.display(), "Mirror database ready");
        Ok(db)
    }

    /// A private in-memory database; contents vanish on drop.
    pub fn in_memory() -> Result<Self, PolicyDeskError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            PolicyDeskError::Storage(format!("Failed to open in-memory db: {}", e))
        })?;
        let db = Self::init(conn, None)?;
        debug!("In-memory mirror database ready");
        Ok(db)
    }

    fn init(conn: Connection, location: Option<PathBuf>) -> Result<Self, PolicyDeskError> {
        let db = Self {
            conn: Mutex::new(conn),
            location,
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// File backing this database; `None` when in memory.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Run `f` with the connection; the lock is held until `f` returns.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, PolicyDeskError>
    where
        F: FnOnce(&Connection) -> Result<T, PolicyDeskError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PolicyDeskError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("location", &self.location)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_database() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM kv_store", [], |row| row.get(0))
                .map_err(|e| PolicyDeskError::Storage(e.to_string()))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_file_database_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("policydesk.db");
        let db = Database::new(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.location(), Some(path.as_path()));
        assert!(Database::in_memory().unwrap().location().is_none());
    }

    #[test]
    fn test_wal_mode_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(&dir.path().join("wal.db")).unwrap();
        db.with_conn(|conn| {
            let mode: String = conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .map_err(|e| PolicyDeskError::Storage(e.to_string()))?;
            assert_eq!(mode, "wal");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_reopen_keeps_migrations_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policydesk.db");
        drop(Database::new(&path).unwrap());
        let db = Database::new(&path).unwrap();
        let versions: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                    row.get(0)
                })
                .map_err(|e| PolicyDeskError::Storage(e.to_string()))
            })
            .unwrap();
        assert_eq!(versions, 1);
    }
}
