// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap
//!
//! Defines all command-line arguments and subcommands for chatwire.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chatwire - streaming chat client
#[derive(Parser, Debug)]
#[command(name = "chatwire")]
#[command(version, about = "Streaming chat client for SSE chat backends")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file path (defaults to ~/.chatwire/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat (default when no command given)
    Chat(ChatArgs),

    /// Ask a single question and stream the answer
    Ask(AskArgs),

    /// List configured providers
    Providers,

    /// Send a non-streaming request to check the backend
    Health(HealthArgs),

    /// Show effective settings and any problems with them
    Config(ConfigArgs),
}

/// Arguments for the chat subcommand
#[derive(clap::Args, Debug, Default)]
pub struct ChatArgs {
    /// Provider to use (falls back to the default provider)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Request whole responses instead of streaming
    #[arg(long)]
    pub no_stream: bool,
}

/// Arguments for the ask subcommand
#[derive(clap::Args, Debug)]
pub struct AskArgs {
    /// The question to ask
    pub prompt: String,

    /// Provider to use (falls back to the default provider)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Request the whole response instead of streaming
    #[arg(long)]
    pub no_stream: bool,
}

/// Arguments for the health subcommand
#[derive(clap::Args, Debug)]
pub struct HealthArgs {
    /// Provider to check
    #[arg(short, long)]
    pub provider: Option<String>,
}

/// Arguments for the config subcommand
#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Only print the settings file path
    #[arg(long)]
    pub path: bool,
}
