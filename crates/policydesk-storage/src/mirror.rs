//! Typed view over the blob that caches the document list.

use std::sync::Arc;

use policydesk_core::error::PolicyDeskError;
use policydesk_core::types::PolicyDocument;

use crate::blob::BlobStore;

/// Reads and writes the full document list as one JSON blob.
#[derive(Clone)]
pub struct DocumentMirror {
    store: Arc<dyn BlobStore>,
    key: String,
}

impl DocumentMirror {
    pub fn new(store: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the cached list. `Ok(None)` when nothing has been cached yet.
    pub fn read(&self) -> Result<Option<Vec<PolicyDocument>>, PolicyDeskError> {
        match self.store.get(&self.key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Replace the cached list.
    pub fn write(&self, documents: &[PolicyDocument]) -> Result<(), PolicyDeskError> {
        let raw = serde_json::to_string(documents)?;
        self.store.set(&self.key, &raw)
    }

    /// Drop the cached list entirely.
    pub fn clear(&self) -> Result<(), PolicyDeskError> {
        self.store.remove(&self.key)
    }
}

impl std::fmt::Debug for DocumentMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentMirror")
            .field("key", &self.key)
            .finish()
    }
}
