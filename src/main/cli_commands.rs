// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io;
use std::path::Path;
use std::sync::Arc;

use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    ExecutableCommand,
};

use chatwire::chat::{ChatOptions, ChatService, ChatSession, Message, MessageValidator};
use chatwire::cli::{AskArgs, ChatArgs, ConfigArgs, HealthArgs};
use chatwire::config::Settings;
use chatwire::error::{ChatwireError, Result};
use chatwire::providers::ProviderRegistry;

use super::chat_ui::{
    print_chat_error, print_validation_error, read_user_input, stream_turn,
};

fn build_service(settings: &Settings) -> Result<ChatService> {
    let registry = Arc::new(ProviderRegistry::from_config(&settings.providers));
    ChatService::from_settings(settings, registry)
}

fn build_session(
    settings: &Settings,
    provider: Option<String>,
    no_stream: bool,
) -> Result<ChatSession> {
    let service = build_service(settings)?;
    let options = ChatOptions {
        provider,
        temperature: Some(settings.model.effective_temperature()),
        streaming: !no_stream,
    };
    Ok(ChatSession::new(service, MessageValidator::new(settings.validation.clone())).with_options(options))
}

/// Run single question mode
pub(super) async fn run_ask(args: AskArgs, settings: Settings) -> Result<()> {
    let mut session = build_session(&settings, args.provider, args.no_stream)?;

    if let Err(err) = session.send(&args.prompt) {
        if let ChatwireError::Validation(validation) = &err {
            print_validation_error(validation)?;
        }
        return Err(err);
    }

    match stream_turn(&mut session).await? {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /clear            start a new conversation");
    println!("  /provider <id>    switch provider");
    println!("  /providers        list providers");
    println!("  /quit             exit");
}

/// Run interactive chat mode
pub(super) async fn run_chat(args: ChatArgs, settings: Settings) -> Result<()> {
    let mut session = build_session(&settings, args.provider, args.no_stream)?;

    println!("chatwire {} - type /help for commands", env!("CARGO_PKG_VERSION"));

    loop {
        let Some(input) = read_user_input(&session.provider())? else {
            break;
        };
        if input.is_empty() {
            continue;
        }

        match input.split_once(' ').unwrap_or((input.as_str(), "")) {
            ("/quit" | "/exit", _) => break,
            ("/help", _) => print_help(),
            ("/clear", _) => {
                session.clear();
                println!("Conversation cleared.");
            }
            ("/providers", _) => run_providers(&settings)?,
            ("/provider", id) => {
                let id = id.trim();
                if session.set_provider(id) {
                    println!("Using provider {}", id);
                } else {
                    println!("Unknown provider '{}'. Try /providers.", id);
                }
            }
            _ => match session.send(&input) {
                Ok(()) => {
                    // Failures were already printed as they arrived
                    stream_turn(&mut session).await?;
                }
                Err(ChatwireError::Validation(error)) => print_validation_error(&error)?,
                Err(err) => return Err(err),
            },
        }
    }

    Ok(())
}

/// List configured providers, marking the default
pub(super) fn run_providers(settings: &Settings) -> Result<()> {
    let registry = ProviderRegistry::from_config(&settings.providers);
    let default_id = registry.resolve(None);
    let mut stdout = io::stdout();

    for provider in registry.all() {
        let is_default = provider.id() == default_id;
        if is_default {
            stdout.execute(SetForegroundColor(Color::Green))?;
        }
        println!(
            "{} {:<12} {:<20} icon: {}",
            if is_default { "*" } else { " " },
            provider.id(),
            provider.display_name(),
            provider.icon_key()
        );
        if is_default {
            stdout.execute(ResetColor)?;
        }
    }

    if registry.is_empty() {
        println!("No providers configured; requests use '{}'.", default_id);
    }
    Ok(())
}

/// Ping the backend with a non-streaming request
pub(super) async fn run_health(args: HealthArgs, settings: Settings) -> Result<()> {
    let service = build_service(&settings)?;
    let provider = service.resolve_provider(args.provider.as_deref());
    let messages = [Message::user("ping")];

    match service.chat(&messages, Some(&provider)).await {
        Ok(content) => {
            let mut stdout = io::stdout();
            stdout.execute(SetForegroundColor(Color::Green))?;
            print!("[OK]");
            stdout.execute(ResetColor)?;
            println!(" {} responded ({} chars)", provider, content.chars().count());
            Ok(())
        }
        Err(error) => {
            print_chat_error(&error)?;
            Err(error.into())
        }
    }
}

/// Print effective settings and validation problems
pub(super) fn run_config(args: ConfigArgs, settings: &Settings, path: &Path) -> Result<()> {
    if args.path {
        println!("{}", path.display());
        return Ok(());
    }

    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(settings)?);

    let problems = settings.validate();
    if !problems.is_empty() {
        let mut stdout = io::stdout();
        stdout.execute(SetForegroundColor(Color::Yellow))?;
        println!("\n{} problem(s):", problems.len());
        stdout.execute(ResetColor)?;
        for problem in problems {
            println!("  - {}", problem);
        }
    }
    Ok(())
}
