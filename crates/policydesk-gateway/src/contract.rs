//! The gateway contract and its wire types.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use policydesk_core::types::{parse_timestamp, ChatRoute, PolicyDocument, Provenance, SessionId};

use crate::error::GatewayError;

/// Operations the remote backend exposes to the client.
///
/// Implementations must not retry or cache; the registry and the
/// conversation decide what a failure means for local state.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// `POST /upload-policy`. Returns the backend's confirmation message.
    async fn upload_policy(&self, upload: &PolicyUpload) -> Result<String, GatewayError>;

    /// `GET /policies`.
    async fn list_policies(&self) -> Result<Vec<PolicyRecord>, GatewayError>;

    /// `DELETE /policies/{name}`.
    async fn delete_policy(&self, name: &str) -> Result<String, GatewayError>;

    /// `DELETE /policies/clear-all`.
    async fn clear_policies(&self) -> Result<String, GatewayError>;

    /// Send one chat turn through `route` and return the raw JSON body.
    async fn chat(
        &self,
        route: ChatRoute,
        query: &str,
        session_id: &SessionId,
    ) -> Result<Value, GatewayError>;

    /// `GET /health`.
    async fn health(&self) -> Result<HealthStatus, GatewayError>;
}

/// A document file on its way to the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct PolicyUpload {
    pub file_name: String,
    pub category: String,
    pub bytes: Vec<u8>,
}

impl PolicyUpload {
    pub fn new(file_name: impl Into<String>, category: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            category: category.into(),
            bytes,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl std::fmt::Debug for PolicyUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyUpload")
            .field("file_name", &self.file_name)
            .field("category", &self.category)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// One entry of the backend's document listing.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PolicyRecord {
    pub name: String,
    #[serde(rename = "type", default)]
    pub policy_type: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub pages: u32,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    /// Approximate size in KiB, as the backend reports it.
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: f64,
}

impl PolicyRecord {
    /// Map into the confirmed document shown to the user.
    pub fn into_document(self) -> PolicyDocument {
        PolicyDocument {
            uploaded_at: self.uploaded_at.as_deref().and_then(parse_timestamp),
            name: self.name,
            category: self.policy_type,
            page_count: self.pages,
            size_mib: self.size / 1024.0,
            provenance: Provenance::Confirmed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PolicyListResponse {
    pub policies: Vec<PolicyRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Backend health report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub log_level: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy") || self.status.eq_ignore_ascii_case("ok")
    }
}

/// Accept integers, whole or fractional floats, and null for a count.
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.round().min(u32::MAX as f64) as u32)
            })
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Accept numbers, numeric strings, and null for a size; negatives clamp to zero.
fn lenient_size<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let size = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if size.is_finite() { size.max(0.0) } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_policy_record_full_shape() {
        let record: PolicyRecord = serde_json::from_value(json!({
            "name": "Leave Policy.pdf",
            "type": "HR",
            "pages": 14,
            "uploaded_at": "2024-03-01T10:15:00Z",
            "size": 1536.0
        }))
        .unwrap();

        let doc = record.into_document();
        assert_eq!(doc.name, "Leave Policy.pdf");
        assert_eq!(doc.category, "HR");
        assert_eq!(doc.page_count, 14);
        assert!((doc.size_mib - 1.5).abs() < f64::EPSILON);
        assert_eq!(
            doc.uploaded_at.unwrap().to_rfc3339(),
            "2024-03-01T10:15:00+00:00"
        );
        assert!(doc.is_confirmed());
    }

    #[test]
    fn test_policy_record_size_is_kib() {
        let record: PolicyRecord =
            serde_json::from_value(json!({ "name": "Leave Policy.pdf", "size": 1024.0 })).unwrap();
        assert_eq!(record.into_document().size_mib, 1.0);

        let record: PolicyRecord =
            serde_json::from_value(json!({ "name": "Leave Policy.pdf", "size": 300.0 })).unwrap();
        assert!((record.into_document().size_mib - 0.29296875).abs() < 1e-12);
    }

    #[test]
    fn test_policy_record_tolerates_missing_and_odd_fields() {
        let record: PolicyRecord = serde_json::from_value(json!({
            "name": "Travel.pdf",
            "pages": 3.0,
            "uploaded_at": "",
            "size": null
        }))
        .unwrap();
        assert_eq!(record.policy_type, "");
        assert_eq!(record.pages, 3);
        assert_eq!(record.size, 0.0);

        let doc = record.into_document();
        assert!(doc.uploaded_at.is_none());
    }

    #[test]
    fn test_lenient_numbers() {
        let record: PolicyRecord = serde_json::from_value(json!({
            "name": "a.pdf",
            "pages": "7",
            "size": -2.0
        }))
        .unwrap();
        assert_eq!(record.pages, 7);
        assert_eq!(record.size, 0.0);

        let record: PolicyRecord = serde_json::from_value(json!({
            "name": "b.pdf",
            "pages": -4,
            "size": "0.75"
        }))
        .unwrap();
        assert_eq!(record.pages, 0);
        assert!((record.size - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_policy_record_requires_name() {
        let result: Result<PolicyRecord, _> = serde_json::from_value(json!({ "type": "HR" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_list_response_requires_policies_key() {
        let result: Result<PolicyListResponse, _> =
            serde_json::from_value(json!({ "documents": [] }));
        assert!(result.is_err());
    }

    #[test]
    fn test_health_status() {
        let health: HealthStatus =
            serde_json::from_value(json!({ "status": "healthy", "debug": true, "log_level": "INFO" }))
                .unwrap();
        assert!(health.is_healthy());
        assert!(health.debug);

        let health: HealthStatus = serde_json::from_value(json!({ "status": "degraded" })).unwrap();
        assert!(!health.is_healthy());
        assert!(health.log_level.is_none());
    }

    #[test]
    fn test_upload_debug_hides_bytes() {
        let upload = PolicyUpload::new("a.pdf", "HR", vec![1, 2, 3]);
        let dbg = format!("{:?}", upload);
        assert!(dbg.contains("size_bytes: 3"));
        assert_eq!(upload.size_bytes(), 3);
    }
}
