//! Error types for gateway calls.

use policydesk_core::error::PolicyDeskError;

/// Failure of a single gateway call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// No response was received (connect failure, DNS, timeout).
    #[error("could not reach {endpoint}: {message}")]
    Transport { endpoint: String, message: String },
    /// The gateway answered with a non-success status.
    #[error("{detail} (HTTP {status})")]
    Status { status: u16, detail: String },
    /// The gateway answered successfully but the body had an unexpected shape.
    #[error("unexpected response from {endpoint}: {message}")]
    Malformed { endpoint: String, message: String },
    /// The configured base URL cannot carry endpoint paths.
    #[error("invalid gateway URL '{0}'")]
    InvalidUrl(String),
    /// The HTTP client could not be constructed.
    #[error("gateway client setup failed: {0}")]
    Setup(String),
}

impl GatewayError {
    pub(crate) fn transport(endpoint: &str, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            format!("connection failed ({})", err)
        } else {
            err.to_string()
        };
        GatewayError::Transport {
            endpoint: endpoint.to_string(),
            message,
        }
    }

    pub(crate) fn malformed(endpoint: &str, message: impl Into<String>) -> Self {
        GatewayError::Malformed {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }

    /// HTTP status for `Status` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport { .. })
    }
}

impl From<GatewayError> for PolicyDeskError {
    fn from(err: GatewayError) -> Self {
        PolicyDeskError::Gateway(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_display() {
        let err = GatewayError::Transport {
            endpoint: "GET /policies".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "could not reach GET /policies: connection refused"
        );
        assert!(err.is_transport());
        assert_eq!(err.status(), None);

        let err = GatewayError::Status {
            status: 400,
            detail: "Only PDF files are allowed".to_string(),
        };
        assert_eq!(err.to_string(), "Only PDF files are allowed (HTTP 400)");
        assert_eq!(err.status(), Some(400));
        assert!(!err.is_transport());

        let err = GatewayError::malformed("POST /chat", "expected value at line 1");
        assert_eq!(
            err.to_string(),
            "unexpected response from POST /chat: expected value at line 1"
        );

        let err = GatewayError::InvalidUrl("mailto:x@y".to_string());
        assert_eq!(err.to_string(), "invalid gateway URL 'mailto:x@y'");
    }

    #[test]
    fn test_gateway_error_into_policydesk_error() {
        let err: PolicyDeskError = GatewayError::Status {
            status: 500,
            detail: "boom".to_string(),
        }
        .into();
        assert!(matches!(err, PolicyDeskError::Gateway(_)));
        assert!(err.to_string().contains("boom"));
    }
}
