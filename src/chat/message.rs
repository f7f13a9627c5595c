// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Message types and conversation state
//!
//! Messages are immutable once appended, except the assistant message that is
//! currently receiving tokens.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,

    /// Text content
    pub content: String,

    /// Creation time in milliseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Model that produced the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Role of the message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// System prompt
    System,
}

impl Message {
    /// Create a new user message stamped with the current time
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Some(Utc::now().timestamp_millis()),
            model: None,
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: None,
            model: None,
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            timestamp: None,
            model: None,
        }
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Caller-owned message log for one chat
///
/// `session_id` changes only on `clear`, so work started for an older
/// session can be recognised and dropped.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    session_id: String,
    /// Stream message id bound to the trailing assistant message
    open_message_id: Option<String>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Create an empty conversation with a fresh session id
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            session_id: Uuid::new_v4().to_string(),
            open_message_id: None,
        }
    }

    /// Messages in insertion order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message. Any open assistant message is closed first.
    pub fn push(&mut self, message: Message) {
        self.open_message_id = None;
        self.messages.push(message);
    }

    /// Fold one streamed token into the log.
    ///
    /// If the trailing message is the assistant message bound to `message_id`
    /// its content is replaced by `content + delta`; otherwise a new assistant
    /// message holding `delta` is appended and bound to `message_id`.
    pub fn apply_token(&mut self, message_id: &str, delta: &str) {
        let extends_open = self.open_message_id.as_deref() == Some(message_id)
            && self
                .messages
                .last()
                .is_some_and(|last| last.role == Role::Assistant);

        if extends_open {
            if let Some(last) = self.messages.last_mut() {
                let mut content = String::with_capacity(last.content.len() + delta.len());
                content.push_str(&last.content);
                content.push_str(delta);
                last.content = content;
            }
            return;
        }

        self.messages.push(Message::assistant(delta));
        self.open_message_id = Some(message_id.to_string());
    }

    /// Stop accepting tokens into the trailing assistant message.
    pub fn close_turn(&mut self) {
        self.open_message_id = None;
    }

    /// Drop every message and start a new session.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.open_message_id = None;
        self.session_id = Uuid::new_v4().to_string();
    }
}
