//! Subcommand handlers and their terminal output.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use policydesk_core::error::PolicyDeskError;
use policydesk_core::types::{ChatRoute, ConversationMessage, PolicyDocument, Provenance};
use policydesk_gateway::{Gateway, PolicyUpload};
use policydesk_session::{ConversationSession, DocumentRegistry, RegistrySummary};

use crate::cli::{Command, DocsCommand};
use crate::repl;

/// Everything a command needs, wired once at startup.
pub struct App {
    pub gateway: Arc<dyn Gateway>,
    pub registry: DocumentRegistry,
    pub conversation: Arc<ConversationSession>,
}

pub async fn run(app: &App, command: Command) -> Result<(), PolicyDeskError> {
    match command {
        Command::Docs { action } => run_docs(app, action).await,
        Command::Ask { question, route } => {
            let route = route.unwrap_or_else(|| app.conversation.route());
            let reply = app.conversation.send(&question.join(" "), route).await?;
            println!("{}", format_reply(&reply));
            Ok(())
        }
        Command::Chat { route } => {
            if let Some(route) = route {
                app.conversation.set_route(route);
            }
            repl::run(app).await
        }
        Command::Health => {
            let health = app.gateway.health().await?;
            println!(
                "Backend {} (debug: {}, log level: {})",
                health.status,
                health.debug,
                health.log_level.as_deref().unwrap_or("-")
            );
            if !health.is_healthy() {
                return Err(PolicyDeskError::Gateway(format!(
                    "backend reported status '{}'",
                    health.status
                )));
            }
            Ok(())
        }
    }
}

async fn run_docs(app: &App, action: DocsCommand) -> Result<(), PolicyDeskError> {
    match action {
        DocsCommand::List => {
            print_documents(&app.registry);
            Ok(())
        }
        DocsCommand::Upload { path, category } => upload(app, &path, &category).await,
        DocsCommand::Delete { name } => {
            let confirmed = app.registry.delete(&name).await;
            println!("Removed '{}'{}", name, remote_note(confirmed));
            Ok(())
        }
        DocsCommand::Clear => {
            let confirmed = app.registry.clear_all().await;
            println!("Cleared all documents{}", remote_note(confirmed));
            Ok(())
        }
    }
}

async fn upload(app: &App, path: &Path, category: &str) -> Result<(), PolicyDeskError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let bytes = tokio::fs::read(path).await?;
    info!(path = %path.display(), bytes = bytes.len(), "Read document");

    let receipt = app
        .registry
        .upload(PolicyUpload::new(file_name, category, bytes))
        .await?;
    if !receipt.message.is_empty() {
        println!("{}", receipt.message);
    }
    println!("{}", format_document(&receipt.document));

    // One-shot runs wait for reconciliation so the mirror holds the confirmed record.
    let name = receipt.document.name.clone();
    if receipt.refresh.await.is_ok() {
        if let Some(doc) = app.registry.get(&name) {
            if doc.is_confirmed() {
                println!("{}", format_document(&doc));
            }
        }
    }
    Ok(())
}

pub fn print_documents(registry: &DocumentRegistry) {
    println!("{}", format_summary(&registry.summary()));
    for doc in registry.documents() {
        println!("  {}", format_document(&doc));
    }
}

fn remote_note(confirmed: bool) -> &'static str {
    if confirmed {
        "."
    } else {
        " locally; the backend did not confirm."
    }
}

pub fn format_summary(summary: &RegistrySummary) -> String {
    format!(
        "{} document{}, {} pages, {:.2} MiB",
        summary.documents,
        if summary.documents == 1 { "" } else { "s" },
        summary.total_pages,
        summary.total_size_mib
    )
}

pub fn format_document(doc: &PolicyDocument) -> String {
    let uploaded = doc
        .uploaded_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let pending = match doc.provenance {
        Provenance::Optimistic => " (processing)",
        Provenance::Confirmed => "",
    };
    format!(
        "{} [{}] {} pages, {:.2} MiB, uploaded {}{}",
        doc.name, doc.category, doc.page_count, doc.size_mib, uploaded, pending
    )
}

pub fn format_reply(message: &ConversationMessage) -> String {
    let mut out = message.text.clone();
    for citation in &message.citations {
        out.push_str("\n  - ");
        out.push_str(&citation.document_name);
        if let Some(page) = citation.page {
            out.push_str(&format!(", p. {}", page));
        }
        if !citation.snippet.is_empty() {
            out.push_str(&format!(": \"{}\"", citation.snippet));
        }
    }
    out
}

pub fn route_label(route: ChatRoute) -> &'static str {
    match route {
        ChatRoute::Direct => "direct (policy backend)",
        ChatRoute::Webhook => "webhook (automation workflow)",
    }
}
