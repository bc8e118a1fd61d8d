//! Session and state reconciliation for PolicyDesk.
//!
//! `DocumentRegistry` keeps the document list in step with the gateway and
//! the local mirror. `ConversationSession` owns the dialogue and its session
//! id. The normalizer turns arbitrary chat payloads into display text.

pub mod conversation;
pub mod error;
pub mod normalizer;
pub mod registry;

pub use conversation::{ConversationSession, Session};
pub use error::{ConversationError, RegistryError};
pub use normalizer::{extract_citations, normalize_payload, normalize_response, NO_RESPONSE_FALLBACK};
pub use registry::{DocumentRegistry, LoadSource, RegistrySummary, UploadReceipt};
