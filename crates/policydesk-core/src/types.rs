use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rough average PDF page size used to estimate page counts before the
/// backend reports the real number.
const ESTIMATED_BYTES_PER_PAGE: u64 = 75 * 1024;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Greeting that opens every fresh conversation.
pub const DEFAULT_GREETING: &str = "Hello! I'm your Company Policy Assistant. I can help you with \
questions about HR, IT, compliance, or operational policies. What would you like to know today?";

// =============================================================================
// Enums
// =============================================================================

/// Where a document record came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Inserted locally when the upload was accepted; awaiting reconciliation.
    Optimistic,
    /// Reported by the gateway's document listing.
    #[default]
    Confirmed,
}

/// Author of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// Remote chat path a message is sent through.
///
/// The two routes differ in endpoint and in the name of the multipart
/// field carrying the session id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRoute {
    /// The policy backend's own retrieval chain.
    #[default]
    Direct,
    /// The workflow-automation webhook.
    Webhook,
}

impl ChatRoute {
    /// Endpoint path segments, relative to the route's base URL.
    pub fn path_segments(&self) -> &'static [&'static str] {
        match self {
            ChatRoute::Direct => &["chat"],
            ChatRoute::Webhook => &["webhook", "chat"],
        }
    }

    /// Multipart field name carrying the session id.
    pub fn session_field(&self) -> &'static str {
        match self {
            ChatRoute::Direct => "session_id",
            ChatRoute::Webhook => "sessionId",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRoute::Direct => "direct",
            ChatRoute::Webhook => "webhook",
        }
    }
}

impl fmt::Display for ChatRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatRoute {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(ChatRoute::Direct),
            "webhook" | "n8n" => Ok(ChatRoute::Webhook),
            other => Err(format!(
                "unknown chat route '{}': expected 'direct' or 'webhook'",
                other
            )),
        }
    }
}

// =============================================================================
// Documents
// =============================================================================

/// An uploaded policy document as shown to the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// File name; unique key within the registry.
    pub name: String,
    /// Free-text category chosen by the uploader (e.g. "HR").
    pub category: String,
    /// Page count; only authoritative once `provenance` is `Confirmed`.
    pub page_count: u32,
    /// Upload time, if the backend reported a parsable one.
    pub uploaded_at: Option<DateTime<Utc>>,
    /// Size in MiB.
    pub size_mib: f64,
    #[serde(default)]
    pub provenance: Provenance,
}

impl PolicyDocument {
    /// Build the local placeholder recorded when an upload is accepted.
    pub fn optimistic(
        name: impl Into<String>,
        category: impl Into<String>,
        size_bytes: u64,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            page_count: estimate_page_count(size_bytes),
            uploaded_at: Some(uploaded_at),
            size_mib: size_bytes as f64 / BYTES_PER_MIB,
            provenance: Provenance::Optimistic,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.provenance == Provenance::Confirmed
    }
}

/// Estimate a page count from a file size. Never returns zero.
pub fn estimate_page_count(size_bytes: u64) -> u32 {
    let pages = size_bytes.div_ceil(ESTIMATED_BYTES_PER_PAGE).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Parse a backend timestamp.
///
/// Accepts RFC 3339 and naive ISO 8601 (treated as UTC, as Python's
/// `datetime.isoformat()` emits). Empty or unrecognised values yield `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}

// =============================================================================
// Conversation
// =============================================================================

/// A reference from an assistant answer back into a source document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub document_name: String,
    pub page: Option<u32>,
    pub snippet: String,
}

/// One turn in the dialogue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: Uuid,
    pub role: Role,
    /// Display text; always a string regardless of the payload shape.
    pub text: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    pub created_at: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text.into(), Vec::new())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text.into(), Vec::new())
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }

    fn new(role: Role, text: String, citations: Vec<Citation>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text,
            citations,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Session identity
// =============================================================================

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Opaque identifier correlating turns with server-side context.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a fresh id from the current time, a process-wide sequence
    /// number, and random entropy.
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let seq = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let entropy: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(9)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        Self(format!("session_{}_{}{}", millis, seq, entropy))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
