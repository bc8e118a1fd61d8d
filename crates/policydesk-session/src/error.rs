//! Error types for the registry and the conversation.

use policydesk_core::error::PolicyDeskError;
use policydesk_gateway::GatewayError;

/// Reasons an upload did not reach the registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("file name cannot be empty")]
    EmptyFileName,
    #[error("only PDF files are accepted: {0}")]
    UnsupportedFile(String),
    #[error("category cannot be empty")]
    EmptyCategory,
    #[error("upload rejected: {0}")]
    Rejected(#[from] GatewayError),
}

/// Reasons a chat turn was refused before any call was made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("no active session")]
    NoSession,
    #[error("message cannot be empty")]
    EmptyMessage,
}

impl From<RegistryError> for PolicyDeskError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Rejected(inner) => inner.into(),
            other => PolicyDeskError::Session(other.to_string()),
        }
    }
}

impl From<ConversationError> for PolicyDeskError {
    fn from(err: ConversationError) -> Self {
        PolicyDeskError::Session(err.to_string())
    }
}
