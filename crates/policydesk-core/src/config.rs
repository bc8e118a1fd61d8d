use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PolicyDeskError, Result};
use crate::types::{ChatRoute, DEFAULT_GREETING};

/// Top-level configuration for the PolicyDesk client.
///
/// Loaded from `~/.policydesk/config.toml` by default. Every section falls
/// back to its defaults when missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyDeskConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl PolicyDeskConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PolicyDeskConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PolicyDeskError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the local document mirror database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.policydesk/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Remote gateway endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the policy backend.
    pub base_url: String,
    /// Base URL for the webhook chat route. Defaults to `base_url`.
    pub webhook_base_url: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl GatewayConfig {
    /// Base URL used for the given chat route.
    pub fn base_url_for(&self, route: ChatRoute) -> &str {
        match route {
            ChatRoute::Direct => &self.base_url,
            ChatRoute::Webhook => self.webhook_base_url.as_deref().unwrap_or(&self.base_url),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            webhook_base_url: None,
            request_timeout_secs: 60,
            user_agent: format!("policydesk/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Document registry reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Delay before the authoritative refresh that follows an upload.
    pub refresh_delay_ms: u64,
    /// Key of the mirror blob holding the cached document list.
    pub mirror_key: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            refresh_delay_ms: 2000,
            mirror_key: "policydesk.documents".to_string(),
        }
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Route selected when the application starts.
    pub default_route: ChatRoute,
    /// Assistant message that opens every fresh conversation.
    pub greeting: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_route: ChatRoute::Direct,
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}
