//! Interactive chat loop over stdin.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use policydesk_core::error::PolicyDeskError;
use policydesk_core::types::{ChatRoute, Role};

use crate::commands::{format_reply, print_documents, route_label, App};

const HELP: &str = "Commands:
  /route <direct|webhook>  switch the chat route
  /clear                   start a new conversation
  /docs                    list uploaded documents
  /session                 show the session id and route
  /help                    show this help
  /quit                    leave";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Message(String),
    Route(ChatRoute),
    ShowRoute,
    Clear,
    Docs,
    Session,
    Help,
    Quit,
    Invalid(String),
    Empty,
}

pub fn parse_line(line: &str) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ReplInput::Message(line.to_string());
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("route"), None) => ReplInput::ShowRoute,
        (Some("route"), Some(arg)) => match arg.parse::<ChatRoute>() {
            Ok(route) => ReplInput::Route(route),
            Err(e) => ReplInput::Invalid(e),
        },
        (Some("clear"), _) => ReplInput::Clear,
        (Some("docs"), _) => ReplInput::Docs,
        (Some("session"), _) => ReplInput::Session,
        (Some("help"), _) => ReplInput::Help,
        (Some("quit") | Some("exit"), _) => ReplInput::Quit,
        _ => ReplInput::Invalid(format!("unknown command '{}'; try /help", line)),
    }
}

pub async fn run(app: &App) -> Result<(), PolicyDeskError> {
    let conversation = &app.conversation;
    for message in conversation.messages() {
        if message.role == Role::Assistant {
            println!("assistant> {}", message.text);
        }
    }
    println!("(route: {}; /help for commands)", route_label(conversation.route()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_line(&line) {
            ReplInput::Empty => continue,
            ReplInput::Message(text) => {
                let reply = conversation.send(&text, conversation.route()).await?;
                println!("assistant> {}", format_reply(&reply));
            }
            ReplInput::Route(route) => {
                conversation.set_route(route);
                println!("Route set to {}", route_label(route));
            }
            ReplInput::ShowRoute => println!("Route: {}", route_label(conversation.route())),
            ReplInput::Clear => {
                conversation.clear();
                for message in conversation.messages() {
                    println!("assistant> {}", message.text);
                }
            }
            ReplInput::Docs => print_documents(&app.registry),
            ReplInput::Session => {
                let id = conversation
                    .session_id()
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "none".to_string());
                println!("Session {} on {}", id, route_label(conversation.route()));
            }
            ReplInput::Help => println!("{}", HELP),
            ReplInput::Quit => break,
            ReplInput::Invalid(reason) => println!("{}", reason),
        }
    }
    debug!("Chat loop finished");
    Ok(())
}
