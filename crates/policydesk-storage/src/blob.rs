//! Synchronous key-value blob storage.
//!
//! `Database` is the durable implementation; `MemoryBlobStore` backs tests
//! and `--ephemeral` runs of the binary.

use std::collections::HashMap;
use std::sync::Mutex;

use rusqlite::OptionalExtension;

use policydesk_core::error::PolicyDeskError;

use crate::db::Database;

/// A synchronous string blob store keyed by namespace strings.
pub trait BlobStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PolicyDeskError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PolicyDeskError>;
    fn remove(&self, key: &str) -> Result<(), PolicyDeskError>;
}

impl BlobStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, PolicyDeskError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| PolicyDeskError::Storage(format!("Failed to read '{}': {}", key, e)))
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PolicyDeskError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%s', 'now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                rusqlite::params![key, value],
            )
            .map_err(|e| PolicyDeskError::Storage(format!("Failed to write '{}': {}", key, e)))?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<(), PolicyDeskError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", rusqlite::params![key])
                .map_err(|e| {
                    PolicyDeskError::Storage(format!("Failed to remove '{}': {}", key, e))
                })?;
            Ok(())
        })
    }
}

/// In-memory blob store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, PolicyDeskError> {
        self.entries
            .lock()
            .map_err(|e| PolicyDeskError::Storage(format!("blob store lock poisoned: {}", e)))
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, PolicyDeskError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PolicyDeskError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PolicyDeskError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
