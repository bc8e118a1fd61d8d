//! Database schema migrations.
//!
//! Applies the key-value table backing the local mirror and records each
//! applied version in `schema_migrations`.

use rusqlite::Connection;
use tracing::info;

use policydesk_core::error::PolicyDeskError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), PolicyDeskError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| PolicyDeskError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| {
            PolicyDeskError::Storage(format!("Failed to query migration version: {}", e))
        })?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: kv_store");
    }

    Ok(())
}

/// Version 1: key-value blob table.
fn apply_v1(conn: &Connection) -> Result<(), PolicyDeskError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS kv_store (
            key         TEXT PRIMARY KEY NOT NULL,
            value       TEXT NOT NULL,
            updated_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'kv_store');
        ",
    )
    .map_err(|e| PolicyDeskError::Storage(format!("Failed to apply migration v1: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_conn() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_migrations_create_kv_store() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO kv_store (key, value) VALUES ('k', 'v')",
            [],
        )
        .unwrap();
        let value: String = conn
            .query_row("SELECT value FROM kv_store WHERE key = 'k'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(value, "v");
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_kv_store_key_is_unique() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        conn.execute("INSERT INTO kv_store (key, value) VALUES ('k', 'a')", [])
            .unwrap();
        let dup = conn.execute("INSERT INTO kv_store (key, value) VALUES ('k', 'b')", []);
        assert!(dup.is_err());
    }
}
