mod cli;
mod commands;
mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use policydesk_core::config::PolicyDeskConfig;
use policydesk_gateway::{Gateway, HttpGateway};
use policydesk_session::{ConversationSession, DocumentRegistry, LoadSource};
use policydesk_storage::{BlobStore, Database, DocumentMirror, MemoryBlobStore};

use cli::CliArgs;
use commands::App;

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

fn open_store(args: &CliArgs, config: &PolicyDeskConfig) -> Result<Arc<dyn BlobStore>, Box<dyn std::error::Error>> {
    if args.ephemeral {
        tracing::info!("Using in-memory document mirror");
        return Ok(Arc::new(MemoryBlobStore::new()));
    }

    let data_dir = resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db_path = data_dir.join("policydesk.db");
    let db = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");
    Ok(Arc::new(db))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing is installed so the file can set the level.
    let config_file = args.resolve_config_path();
    let mut config = PolicyDeskConfig::load_or_default(&config_file);
    args.apply_overrides(&mut config);

    // Tracing goes to stderr so it never interleaves with answers on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting PolicyDesk v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), gateway = %config.gateway.base_url, "Configuration loaded");

    let store = open_store(&args, &config)?;
    let gateway: Arc<dyn Gateway> = Arc::new(HttpGateway::new(&config.gateway)?);

    let mirror = DocumentMirror::new(store, config.registry.mirror_key.clone());
    let registry = DocumentRegistry::from_config(Arc::clone(&gateway), mirror, &config.registry);
    let conversation = Arc::new(ConversationSession::from_config(
        Arc::clone(&gateway),
        &config.chat,
    ));

    match registry.load().await {
        LoadSource::Gateway => tracing::debug!(count = registry.len(), "Documents synced"),
        LoadSource::Mirror => {
            tracing::warn!(count = registry.len(), "Backend unreachable; showing cached documents")
        }
        LoadSource::Empty => tracing::debug!("No documents available"),
    }
    conversation.start();

    let app = App {
        gateway,
        registry,
        conversation,
    };
    commands::run(&app, args.command).await?;
    Ok(())
}
