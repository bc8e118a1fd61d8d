//! The conversation: one session id, an append-only list of turns, and the
//! route new turns go through.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use policydesk_core::config::ChatConfig;
use policydesk_core::types::{ChatRoute, ConversationMessage, SessionId};
use policydesk_gateway::Gateway;

use crate::error::ConversationError;
use crate::normalizer::{extract_citations, normalize_payload};

const ERROR_HINT: &str = "Please make sure the policy backend is reachable and try again.";

/// The active session identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub started_at: DateTime<Utc>,
}

/// Multi-turn dialogue with the gateway.
///
/// Every accepted `send` appends one user turn immediately and exactly one
/// assistant turn once the gateway call settles. Overlapping sends are
/// allowed; their answers land in the order the calls finish.
pub struct ConversationSession {
    gateway: Arc<dyn Gateway>,
    greeting: String,
    session: Mutex<Option<Session>>,
    messages: Arc<Mutex<Vec<ConversationMessage>>>,
    route: Mutex<ChatRoute>,
    pending: Arc<AtomicUsize>,
}

impl ConversationSession {
    /// Create a conversation with no session. Call [`start`](Self::start)
    /// before sending.
    pub fn new(gateway: Arc<dyn Gateway>, greeting: impl Into<String>, route: ChatRoute) -> Self {
        Self {
            gateway,
            greeting: greeting.into(),
            session: Mutex::new(None),
            messages: Arc::new(Mutex::new(Vec::new())),
            route: Mutex::new(route),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_config(gateway: Arc<dyn Gateway>, config: &ChatConfig) -> Self {
        Self::new(gateway, config.greeting.clone(), config.default_route)
    }

    /// Begin a fresh session: new id, and the greeting as the only turn.
    pub fn start(&self) -> SessionId {
        let session = Session {
            id: SessionId::generate(),
            started_at: Utc::now(),
        };
        let id = session.id.clone();

        *lock(&self.messages) = vec![ConversationMessage::assistant(self.greeting.clone())];
        *lock(&self.session) = Some(session);
        info!(session = %id, "Conversation started");
        id
    }

    /// Send one user turn through `route` and append the answer.
    ///
    /// Gateway failures do not surface as errors; they become an apologetic
    /// assistant turn. Returns the assistant turn that was appended.
    ///
    /// The gateway call runs on its own task, so the assistant turn is
    /// appended even if this future is dropped before it resolves.
    pub async fn send(
        &self,
        text: &str,
        route: ChatRoute,
    ) -> Result<ConversationMessage, ConversationError> {
        let Some(session_id) = self.session_id() else {
            warn!("Message refused: no active session");
            return Err(ConversationError::NoSession);
        };
        if text.trim().is_empty() {
            return Err(ConversationError::EmptyMessage);
        }

        self.append(ConversationMessage::user(text));

        let gateway = Arc::clone(&self.gateway);
        let messages = Arc::clone(&self.messages);
        let pending = PendingGuard::enter(Arc::clone(&self.pending));
        let query = text.to_string();
        let turn = tokio::spawn(async move {
            let _pending = pending;
            debug!(session = %session_id, %route, "Dispatching chat turn");
            let reply = match gateway.chat(route, &query, &session_id).await {
                Ok(payload) => ConversationMessage::assistant(normalize_payload(&payload))
                    .with_citations(extract_citations(&payload)),
                Err(e) => {
                    warn!(session = %session_id, %route, error = %e, "Chat turn failed");
                    ConversationMessage::assistant(apology(&e.to_string()))
                }
            };
            lock(&messages).push(reply.clone());
            reply
        });

        match turn.await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!(error = %e, "Chat turn task aborted");
                let reply = ConversationMessage::assistant(apology(""));
                self.append(reply.clone());
                Ok(reply)
            }
        }
    }

    /// Drop the dialogue and start over with a new session id.
    pub fn clear(&self) -> SessionId {
        debug!("Clearing conversation");
        self.start()
    }

    pub fn route(&self) -> ChatRoute {
        *lock(&self.route)
    }

    pub fn set_route(&self, route: ChatRoute) {
        *lock(&self.route) = route;
        info!(%route, "Chat route changed");
    }

    pub fn messages(&self) -> Vec<ConversationMessage> {
        lock(&self.messages).clone()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        lock(&self.session).as_ref().map(|s| s.id.clone())
    }

    pub fn session(&self) -> Option<Session> {
        lock(&self.session).clone()
    }

    pub fn is_pending(&self) -> bool {
        self.pending_count() > 0
    }

    /// Number of gateway calls currently in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    fn append(&self, message: ConversationMessage) {
        lock(&self.messages).push(message);
    }
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("session", &self.session_id())
            .field("route", &self.route())
            .field("messages", &lock(&self.messages).len())
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Text of the assistant turn appended when a chat call fails.
pub fn apology(failure: &str) -> String {
    let failure = failure.trim();
    if failure.is_empty() {
        format!("Sorry, I encountered an error. {}", ERROR_HINT)
    } else {
        format!("Sorry, I encountered an error: {}. {}", failure, ERROR_HINT)
    }
}

/// Holds one unit of the pending counter until the chat task finishes.
struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
