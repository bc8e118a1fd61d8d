//! reqwest-backed implementation of [`Gateway`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use policydesk_core::config::GatewayConfig;
use policydesk_core::types::{ChatRoute, SessionId};

use crate::contract::{
    Gateway, HealthStatus, MessageResponse, PolicyListResponse, PolicyRecord, PolicyUpload,
};
use crate::error::GatewayError;

const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Value,
}

/// HTTP client for the policy backend and the webhook route.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: Url,
    webhook_base_url: Url,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| GatewayError::Setup(e.to_string()))?;

        Ok(Self {
            http,
            base_url: parse_base(&config.base_url)?,
            webhook_base_url: parse_base(config.base_url_for(ChatRoute::Webhook))?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn base_for(&self, route: ChatRoute) -> &Url {
        match route {
            ChatRoute::Direct => &self.base_url,
            ChatRoute::Webhook => &self.webhook_base_url,
        }
    }

    async fn send(&self, label: &str, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::transport(label, &e))?;

        let status = response.status();
        debug!(endpoint = label, status = status.as_u16(), "Gateway responded");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = error_detail(&body)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "request failed".to_string());
        warn!(endpoint = label, status = status.as_u16(), %detail, "Gateway call failed");
        Err(GatewayError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        label: &str,
        request: RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = self.send(label, request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::transport(label, &e))?;
        serde_json::from_str(&body).map_err(|e| GatewayError::malformed(label, e.to_string()))
    }

    async fn send_message(
        &self,
        label: &str,
        request: RequestBuilder,
    ) -> Result<String, GatewayError> {
        let body: MessageResponse = self.send_json(label, request).await?;
        Ok(body.message.unwrap_or_default())
    }

    fn request(
        &self,
        method: Method,
        base: &Url,
        segments: &[&str],
    ) -> Result<RequestBuilder, GatewayError> {
        Ok(self.http.request(method, endpoint(base, segments)?))
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn upload_policy(&self, upload: &PolicyUpload) -> Result<String, GatewayError> {
        const LABEL: &str = "POST /upload-policy";
        debug!(
            file = %upload.file_name,
            category = %upload.category,
            bytes = upload.size_bytes(),
            "Uploading policy document"
        );
        let part = multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str("application/pdf")
            .map_err(|e| GatewayError::Setup(e.to_string()))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("policy_type", upload.category.clone());

        let request = self
            .request(Method::POST, &self.base_url, &["upload-policy"])?
            .multipart(form);
        self.send_message(LABEL, request).await
    }

    async fn list_policies(&self) -> Result<Vec<PolicyRecord>, GatewayError> {
        let request = self.request(Method::GET, &self.base_url, &["policies"])?;
        let body: PolicyListResponse = self.send_json("GET /policies", request).await?;
        debug!(count = body.policies.len(), "Listed policies");
        Ok(body.policies)
    }

    async fn delete_policy(&self, name: &str) -> Result<String, GatewayError> {
        let request = self.request(Method::DELETE, &self.base_url, &["policies", name])?;
        self.send_message("DELETE /policies/{name}", request).await
    }

    async fn clear_policies(&self) -> Result<String, GatewayError> {
        let request = self.request(Method::DELETE, &self.base_url, &["policies", "clear-all"])?;
        self.send_message("DELETE /policies/clear-all", request).await
    }

    async fn chat(
        &self,
        route: ChatRoute,
        query: &str,
        session_id: &SessionId,
    ) -> Result<Value, GatewayError> {
        let label = match route {
            ChatRoute::Direct => "POST /chat",
            ChatRoute::Webhook => "POST /webhook/chat",
        };
        debug!(route = %route, session = %session_id, "Sending chat turn");
        let form = multipart::Form::new()
            .text("query", query.to_string())
            .text(route.session_field(), session_id.as_str().to_string());

        let request = self
            .request(Method::POST, self.base_for(route), route.path_segments())?
            .multipart(form);
        self.send_json(label, request).await
    }

    async fn health(&self) -> Result<HealthStatus, GatewayError> {
        let request = self.request(Method::GET, &self.base_url, &["health"])?;
        self.send_json("GET /health", request).await
    }
}

fn parse_base(raw: &str) -> Result<Url, GatewayError> {
    let url = Url::parse(raw.trim()).map_err(|_| GatewayError::InvalidUrl(raw.to_string()))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(GatewayError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// Append path segments to `base`, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, GatewayError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| GatewayError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Prefer the backend's `{"detail": ...}` body, then the raw body text.
fn error_detail(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        match parsed.detail {
            Value::String(s) if !s.trim().is_empty() => return Some(s),
            Value::String(_) | Value::Null => {}
            other => return Some(other.to_string()),
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(ERROR_BODY_LIMIT).collect())
}
