#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use policydesk_core::types::{ChatRoute, SessionId};
use policydesk_gateway::{Gateway, GatewayError, HealthStatus, PolicyRecord, PolicyUpload};
use policydesk_storage::{BlobStore, DocumentMirror, MemoryBlobStore};

pub const MIRROR_KEY: &str = "policydesk.documents";

pub fn unreachable() -> GatewayError {
    GatewayError::Transport {
        endpoint: "GET /policies".to_string(),
        message: "connection refused".to_string(),
    }
}

pub fn record(name: &str, category: &str, pages: u32) -> PolicyRecord {
    PolicyRecord {
        name: name.to_string(),
        policy_type: category.to_string(),
        pages,
        uploaded_at: Some("2024-05-01T08:30:00".to_string()),
        size: 409.6,
    }
}

pub fn memory_mirror() -> (Arc<MemoryBlobStore>, DocumentMirror) {
    let store = Arc::new(MemoryBlobStore::new());
    let mirror = DocumentMirror::new(store.clone() as Arc<dyn BlobStore>, MIRROR_KEY);
    (store, mirror)
}

/// One scripted answer for a chat call.
pub enum ChatScript {
    Reply(Result<Value, GatewayError>),
    Gated(oneshot::Receiver<Result<Value, GatewayError>>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatCall {
    pub route: ChatRoute,
    pub query: String,
    pub session_id: SessionId,
}

/// In-process gateway whose answers are set by the test.
pub struct ScriptedGateway {
    listing: Mutex<Result<Vec<PolicyRecord>, GatewayError>>,
    upload_result: Mutex<Result<String, GatewayError>>,
    delete_result: Mutex<Result<String, GatewayError>>,
    clear_result: Mutex<Result<String, GatewayError>>,
    chat_scripts: Mutex<VecDeque<ChatScript>>,
    pub list_calls: AtomicUsize,
    pub uploads: Mutex<Vec<PolicyUpload>>,
    pub deletes: Mutex<Vec<String>>,
    pub clears: AtomicUsize,
    pub chats: Mutex<Vec<ChatCall>>,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            listing: Mutex::new(Ok(Vec::new())),
            upload_result: Mutex::new(Ok("uploaded and indexed successfully.".to_string())),
            delete_result: Mutex::new(Ok("deleted".to_string())),
            clear_result: Mutex::new(Ok("cleared".to_string())),
            chat_scripts: Mutex::new(VecDeque::new()),
            list_calls: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            clears: AtomicUsize::new(0),
            chats: Mutex::new(Vec::new()),
        })
    }

    pub fn set_listing(&self, listing: Result<Vec<PolicyRecord>, GatewayError>) {
        *self.listing.lock().unwrap() = listing;
    }

    pub fn set_upload_result(&self, result: Result<String, GatewayError>) {
        *self.upload_result.lock().unwrap() = result;
    }

    pub fn set_delete_result(&self, result: Result<String, GatewayError>) {
        *self.delete_result.lock().unwrap() = result;
    }

    pub fn set_clear_result(&self, result: Result<String, GatewayError>) {
        *self.clear_result.lock().unwrap() = result;
    }

    pub fn push_chat(&self, reply: Result<Value, GatewayError>) {
        self.chat_scripts
            .lock()
            .unwrap()
            .push_back(ChatScript::Reply(reply));
    }

    /// Queue a chat answer that resolves only when the returned sender fires.
    pub fn push_gated_chat(&self) -> oneshot::Sender<Result<Value, GatewayError>> {
        let (tx, rx) = oneshot::channel();
        self.chat_scripts
            .lock()
            .unwrap()
            .push_back(ChatScript::Gated(rx));
        tx
    }

    pub fn chat_calls(&self) -> Vec<ChatCall> {
        self.chats.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn upload_policy(&self, upload: &PolicyUpload) -> Result<String, GatewayError> {
        self.uploads.lock().unwrap().push(upload.clone());
        self.upload_result.lock().unwrap().clone()
    }

    async fn list_policies(&self) -> Result<Vec<PolicyRecord>, GatewayError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.listing.lock().unwrap().clone()
    }

    async fn delete_policy(&self, name: &str) -> Result<String, GatewayError> {
        self.deletes.lock().unwrap().push(name.to_string());
        self.delete_result.lock().unwrap().clone()
    }

    async fn clear_policies(&self) -> Result<String, GatewayError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.clear_result.lock().unwrap().clone()
    }

    async fn chat(
        &self,
        route: ChatRoute,
        query: &str,
        session_id: &SessionId,
    ) -> Result<Value, GatewayError> {
        self.chats.lock().unwrap().push(ChatCall {
            route,
            query: query.to_string(),
            session_id: session_id.clone(),
        });
        let script = self.chat_scripts.lock().unwrap().pop_front();
        match script {
            Some(ChatScript::Reply(reply)) => reply,
            Some(ChatScript::Gated(rx)) => rx.await.unwrap_or_else(|_| {
                Err(GatewayError::Transport {
                    endpoint: "POST /chat".to_string(),
                    message: "gate dropped".to_string(),
                })
            }),
            None => Err(GatewayError::Status {
                status: 500,
                detail: "no scripted reply".to_string(),
            }),
        }
    }

    async fn health(&self) -> Result<HealthStatus, GatewayError> {
        Ok(HealthStatus {
            status: "healthy".to_string(),
            debug: false,
            log_level: None,
        })
    }
}
