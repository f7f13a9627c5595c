// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! chatwire - streaming chat client
//!
//! Entry point for the chatwire CLI application.

use anyhow::Context;
use clap::Parser;

use chatwire::cli::{ChatArgs, Cli, Commands};
use chatwire::config::Settings;

#[path = "main/chat_ui.rs"]
mod chat_ui;
#[path = "main/cli_commands.rs"]
mod cli_commands;

use cli_commands::{run_ask, run_chat, run_config, run_health, run_providers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    // `-v` turns on the library's own targets; `RUST_LOG` still applies on top.
    if cli.verbose > 0 {
        let level = if cli.verbose > 1 { "trace" } else { "debug" };
        for target in [
            "chatwire.transport",
            "chatwire.chat",
            "chatwire.providers",
            "chatwire.config",
        ] {
            if let Ok(parsed) = format!("{}={}", target, level).parse() {
                env_filter = env_filter.add_directive(parsed);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let settings_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load_from(&settings_path)
        .with_context(|| format!("failed to load settings from {}", settings_path.display()))?;
    settings.apply_env_overrides();

    for problem in settings.validate() {
        tracing::warn!(target: "chatwire.config", "{}", problem);
    }

    match cli.command {
        None => run_chat(ChatArgs::default(), settings).await?,
        Some(Commands::Chat(args)) => run_chat(args, settings).await?,
        Some(Commands::Ask(args)) => run_ask(args, settings).await?,
        Some(Commands::Providers) => run_providers(&settings)?,
        Some(Commands::Health(args)) => run_health(args, settings).await?,
        Some(Commands::Config(args)) => run_config(args, &settings, &settings_path)?,
    }

    Ok(())
}
