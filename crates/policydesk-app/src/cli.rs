//! CLI argument definitions for the `policydesk` binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use policydesk_core::config::PolicyDeskConfig;
use policydesk_core::types::ChatRoute;

const CONFIG_ENV: &str = "POLICYDESK_CONFIG";
const GATEWAY_URL_ENV: &str = "POLICYDESK_GATEWAY_URL";

/// PolicyDesk: upload company policy documents and ask questions about them.
#[derive(Parser, Debug)]
#[command(name = "policydesk", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the policy backend.
    #[arg(short = 'g', long = "gateway-url", global = true)]
    pub gateway_url: Option<String>,

    /// Directory holding the local document mirror.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Keep the document mirror in memory only.
    #[arg(long = "ephemeral", global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Manage uploaded policy documents.
    Docs {
        #[command(subcommand)]
        action: DocsCommand,
    },
    /// Ask a single question and print the answer.
    Ask {
        /// The question; multiple words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
        /// Chat route (direct or webhook).
        #[arg(short = 'r', long = "route")]
        route: Option<ChatRoute>,
    },
    /// Start an interactive conversation.
    Chat {
        /// Initial chat route (direct or webhook).
        #[arg(short = 'r', long = "route")]
        route: Option<ChatRoute>,
    },
    /// Check whether the backend is up.
    Health,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum DocsCommand {
    /// List known documents.
    List,
    /// Upload a PDF.
    Upload {
        path: PathBuf,
        /// Policy category, e.g. HR, IT, Compliance.
        #[arg(long = "category")]
        category: String,
    },
    /// Delete a document by name.
    Delete { name: String },
    /// Delete every document.
    Clear,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > POLICYDESK_CONFIG env var > ~/.policydesk/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        pick_config_path(self.config.as_ref(), std::env::var(CONFIG_ENV).ok())
    }

    /// Apply command-line and environment overrides on top of the file config.
    pub fn apply_overrides(&self, config: &mut PolicyDeskConfig) {
        self.apply_overrides_with(config, std::env::var(GATEWAY_URL_ENV).ok());
    }

    fn apply_overrides_with(&self, config: &mut PolicyDeskConfig, env_gateway: Option<String>) {
        if let Some(url) = self
            .gateway_url
            .clone()
            .or(env_gateway.filter(|u| !u.trim().is_empty()))
        {
            config.gateway.base_url = url;
        }
        if let Some(ref dir) = self.data_dir {
            config.general.data_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
    }
}

fn pick_config_path(flag: Option<&PathBuf>, env: Option<String>) -> PathBuf {
    if let Some(p) = flag {
        return p.clone();
    }
    if let Some(p) = env.filter(|p| !p.trim().is_empty()) {
        return PathBuf::from(p);
    }
    default_config_path()
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".policydesk").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".policydesk").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_docs_subcommands() {
        let args = parse(&["policydesk", "docs", "list"]);
        assert_eq!(
            args.command,
            Command::Docs {
                action: DocsCommand::List
            }
        );

        let args = parse(&[
            "policydesk",
            "docs",
            "upload",
            "/tmp/Leave Policy.pdf",
            "--category",
            "HR",
        ]);
        assert_eq!(
            args.command,
            Command::Docs {
                action: DocsCommand::Upload {
                    path: PathBuf::from("/tmp/Leave Policy.pdf"),
                    category: "HR".to_string()
                }
            }
        );

        let args = parse(&["policydesk", "docs", "delete", "Leave Policy.pdf"]);
        assert_eq!(
            args.command,
            Command::Docs {
                action: DocsCommand::Delete {
                    name: "Leave Policy.pdf".to_string()
                }
            }
        );
    }

    #[test]
    fn test_upload_requires_category() {
        assert!(CliArgs::try_parse_from(["policydesk", "docs", "upload", "a.pdf"]).is_err());
    }

    #[test]
    fn test_parse_ask_joins_words_and_route() {
        let args = parse(&[
            "policydesk", "ask", "How", "many", "leave", "days?", "--route", "webhook",
        ]);
        match args.command {
            Command::Ask { question, route } => {
                assert_eq!(question.join(" "), "How many leave days?");
                assert_eq!(route, Some(ChatRoute::Webhook));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_route() {
        assert!(CliArgs::try_parse_from(["policydesk", "chat", "--route", "pigeon"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["policydesk", "health", "--ephemeral", "-g", "http://10.0.0.2:8000"]);
        assert!(args.ephemeral);
        assert_eq!(args.gateway_url.as_deref(), Some("http://10.0.0.2:8000"));
        assert_eq!(args.command, Command::Health);
    }

    #[test]
    fn test_config_path_priority() {
        let flag = PathBuf::from("/etc/policydesk.toml");
        assert_eq!(
            pick_config_path(Some(&flag), Some("/from/env.toml".to_string())),
            flag
        );
        assert_eq!(
            pick_config_path(None, Some("/from/env.toml".to_string())),
            PathBuf::from("/from/env.toml")
        );
        assert!(pick_config_path(None, None).ends_with("config.toml"));
    }

    #[test]
    fn test_overrides_priority() {
        let mut config = PolicyDeskConfig::default();
        let args = parse(&["policydesk", "health"]);
        args.apply_overrides_with(&mut config, Some("http://env:8000".to_string()));
        assert_eq!(config.gateway.base_url, "http://env:8000");

        let mut config = PolicyDeskConfig::default();
        let args = parse(&[
            "policydesk",
            "-g",
            "http://flag:8000",
            "-d",
            "/srv/pd",
            "-l",
            "debug",
            "health",
        ]);
        args.apply_overrides_with(&mut config, Some("http://env:8000".to_string()));
        assert_eq!(config.gateway.base_url, "http://flag:8000");
        assert_eq!(config.general.data_dir, "/srv/pd");
        assert_eq!(config.general.log_level, "debug");
    }

    #[test]
    fn test_no_overrides_keeps_file_values() {
        let mut config = PolicyDeskConfig::default();
        config.gateway.base_url = "http://file:8000".to_string();
        let args = parse(&["policydesk", "docs", "list"]);
        args.apply_overrides_with(&mut config, None);
        assert_eq!(config.gateway.base_url, "http://file:8000");
        assert_eq!(config.general.log_level, "info");
    }
}
