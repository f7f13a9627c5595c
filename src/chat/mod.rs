// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat turns over a streaming connection
//!
//! `ChatService` runs turns and reports through `ChatCallbacks`; `ChatSession`
//! is the caller-side controller that owns a `Conversation` and folds those
//! callbacks into it.

pub mod callbacks;
pub mod limits;
pub mod message;
pub mod service;
pub mod session;
pub mod streaming;
pub mod validation;

pub use callbacks::{ChannelCallbacks, ChatCallbacks, ChatEvent};
pub use limits::{StreamLimiter, StreamPermit};
pub use message::{Conversation, Message, Role};
pub use service::{ChatOptions, ChatService, TurnOutcome};
pub use session::ChatSession;
pub use streaming::{parse_payload, StreamPayload, StreamToken, TokenAccumulator};
pub use validation::{first_n_chars_or_less, MessageValidator};
