// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! chatwire - streaming chat transport for SSE chat backends.
//!
//! This crate exposes the shared runtime used by the `chatwire` CLI
//! (`src/main.rs`) and by any front end that wants token-by-token chat.
//!
//! Architecture highlights:
//! - `transport`: SSE connection establishment, retry with backoff, status reporting
//! - `chat`: message validation, turn orchestration, caller-side session state
//! - `providers`: provider registry and resolution
//! - `config`: settings file, environment overrides and settings validation

pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod providers;
pub mod transport;

pub use error::{ChatwireError, Result};
