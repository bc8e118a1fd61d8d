//! The document registry: local document list reconciled against the gateway.
//!
//! Local changes are applied first and the gateway is told afterwards. Only a
//! successful listing from the gateway replaces what the user sees, so an
//! optimistic record stays visible until the next refresh succeeds. Every
//! change is written through to the mirror so the next start has something to
//! show when the gateway is unreachable.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use policydesk_core::config::RegistryConfig;
use policydesk_core::types::PolicyDocument;
use policydesk_gateway::{Gateway, PolicyUpload};
use policydesk_storage::DocumentMirror;

use crate::error::RegistryError;

/// Where the list shown after `load()` came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadSource {
    Gateway,
    Mirror,
    Empty,
}

/// Dashboard counters over the current list.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RegistrySummary {
    pub documents: usize,
    pub total_pages: u64,
    pub total_size_mib: f64,
}

/// Result of an accepted upload.
#[derive(Debug)]
pub struct UploadReceipt {
    /// The optimistic record now at the front of the list.
    pub document: PolicyDocument,
    /// Confirmation text from the gateway.
    pub message: String,
    /// The scheduled reconciliation; await it to observe the confirmed record.
    pub refresh: JoinHandle<()>,
}

struct RegistryInner {
    gateway: Arc<dyn Gateway>,
    mirror: DocumentMirror,
    documents: Mutex<Vec<PolicyDocument>>,
    refresh_delay: Duration,
}

/// Ordered, most-recent-first collection of documents keyed by name.
///
/// Cheap to clone; clones share the same list.
#[derive(Clone)]
pub struct DocumentRegistry {
    inner: Arc<RegistryInner>,
}

impl DocumentRegistry {
    pub fn new(gateway: Arc<dyn Gateway>, mirror: DocumentMirror, refresh_delay: Duration) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                gateway,
                mirror,
                documents: Mutex::new(Vec::new()),
                refresh_delay,
            }),
        }
    }

    pub fn from_config(
        gateway: Arc<dyn Gateway>,
        mirror: DocumentMirror,
        config: &RegistryConfig,
    ) -> Self {
        Self::new(
            gateway,
            mirror,
            Duration::from_millis(config.refresh_delay_ms),
        )
    }

    /// Initial population. Prefers the gateway, falls back to the mirror,
    /// and ends up empty when neither is usable.
    pub async fn load(&self) -> LoadSource {
        match self.inner.gateway.list_policies().await {
            Ok(records) => {
                let docs: Vec<PolicyDocument> =
                    records.into_iter().map(|r| r.into_document()).collect();
                info!(count = docs.len(), "Loaded documents from gateway");
                self.replace(docs);
                LoadSource::Gateway
            }
            Err(e) => {
                warn!(error = %e, "Document listing failed, falling back to mirror");
                let cached = match self.inner.mirror.read() {
                    Ok(cached) => cached,
                    Err(e) => {
                        warn!(error = %e, key = self.inner.mirror.key(), "Mirror unreadable");
                        None
                    }
                };
                match cached {
                    Some(docs) => {
                        info!(count = docs.len(), "Loaded documents from mirror");
                        *self.lock() = docs;
                        LoadSource::Mirror
                    }
                    None => {
                        self.lock().clear();
                        LoadSource::Empty
                    }
                }
            }
        }
    }

    /// Replace the list with the gateway's. Returns `false` and leaves the
    /// list untouched when the listing fails.
    pub async fn refresh(&self) -> bool {
        match self.inner.gateway.list_policies().await {
            Ok(records) => {
                let docs: Vec<PolicyDocument> =
                    records.into_iter().map(|r| r.into_document()).collect();
                debug!(count = docs.len(), "Refreshed documents");
                self.replace(docs);
                true
            }
            Err(e) => {
                warn!(error = %e, "Document refresh failed; keeping local list");
                false
            }
        }
    }

    /// Put `doc` at the front, replacing any record with the same name, and
    /// schedule a refresh after the configured delay.
    ///
    /// Must be called from within a tokio runtime.
    pub fn record_optimistic_upload(&self, doc: PolicyDocument) -> JoinHandle<()> {
        debug!(name = %doc.name, pages = doc.page_count, "Recording optimistic upload");
        let snapshot = {
            let mut docs = self.lock();
            docs.retain(|d| d.name != doc.name);
            docs.insert(0, doc);
            docs.clone()
        };
        self.persist(&snapshot);

        let registry = self.clone();
        let delay = self.inner.refresh_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            registry.refresh().await;
        })
    }

    /// Validate and send a document, then record it optimistically.
    pub async fn upload(&self, upload: PolicyUpload) -> Result<UploadReceipt, RegistryError> {
        let file_name = upload.file_name.trim();
        if file_name.is_empty() {
            return Err(RegistryError::EmptyFileName);
        }
        if !file_name.to_ascii_lowercase().ends_with(".pdf") {
            return Err(RegistryError::UnsupportedFile(file_name.to_string()));
        }
        let category = upload.category.trim();
        if category.is_empty() {
            return Err(RegistryError::EmptyCategory);
        }

        let upload = PolicyUpload::new(file_name, category, upload.bytes);
        let message = self.inner.gateway.upload_policy(&upload).await?;
        info!(name = %upload.file_name, category = %upload.category, "Upload accepted");

        let document = PolicyDocument::optimistic(
            upload.file_name,
            upload.category,
            upload.bytes.len() as u64,
            Utc::now(),
        );
        let refresh = self.record_optimistic_upload(document.clone());
        Ok(UploadReceipt {
            document,
            message,
            refresh,
        })
    }

    /// Remove `name` locally, then ask the gateway to delete it.
    ///
    /// The record stays removed even if the gateway call fails. Returns
    /// whether the gateway acknowledged the deletion.
    pub async fn delete(&self, name: &str) -> bool {
        let snapshot = {
            let mut docs = self.lock();
            docs.retain(|d| d.name != name);
            docs.clone()
        };
        self.persist(&snapshot);

        match self.inner.gateway.delete_policy(name).await {
            Ok(message) => {
                info!(name, %message, "Document deleted");
                true
            }
            Err(e) => {
                warn!(name, error = %e, "Remote delete failed; document stays removed locally");
                false
            }
        }
    }

    /// Empty the list and the mirror, then ask the gateway to clear
    /// everything. Returns whether the gateway acknowledged it.
    pub async fn clear_all(&self) -> bool {
        self.lock().clear();
        if let Err(e) = self.inner.mirror.clear() {
            warn!(error = %e, key = self.inner.mirror.key(), "Failed to drop mirror");
        }

        match self.inner.gateway.clear_policies().await {
            Ok(message) => {
                info!(%message, "All documents cleared");
                true
            }
            Err(e) => {
                warn!(error = %e, "Remote clear failed; local list stays empty");
                false
            }
        }
    }

    pub fn documents(&self) -> Vec<PolicyDocument> {
        self.lock().clone()
    }

    pub fn get(&self, name: &str) -> Option<PolicyDocument> {
        self.lock().iter().find(|d| d.name == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn summary(&self) -> RegistrySummary {
        let docs = self.lock();
        RegistrySummary {
            documents: docs.len(),
            total_pages: docs.iter().map(|d| u64::from(d.page_count)).sum(),
            total_size_mib: docs.iter().map(|d| d.size_mib).sum(),
        }
    }

    fn replace(&self, docs: Vec<PolicyDocument>) {
        let snapshot = {
            let mut current = self.lock();
            *current = docs;
            current.clone()
        };
        self.persist(&snapshot);
    }

    fn persist(&self, docs: &[PolicyDocument]) {
        if let Err(e) = self.inner.mirror.write(docs) {
            warn!(error = %e, key = self.inner.mirror.key(), "Failed to write mirror");
        }
    }

    // A poisoned list is still a valid list; keep serving it.
    fn lock(&self) -> MutexGuard<'_, Vec<PolicyDocument>> {
        self.inner
            .documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for DocumentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRegistry")
            .field("documents", &self.len())
            .field("mirror", &self.inner.mirror)
            .field("refresh_delay", &self.inner.refresh_delay)
            .finish()
    }
}
