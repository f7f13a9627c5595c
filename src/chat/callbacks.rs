// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Callbacks through which a streaming turn reports its progress

use tokio::sync::mpsc;

use crate::error::ChatError;
use crate::transport::status::ConnectionStatus;

/// Receiver of turn progress.
///
/// For one turn exactly one of `on_complete` or a terminal `on_error` fires,
/// unless the turn is cancelled, in which case neither does. Non-terminal
/// errors (see `ChatError::is_terminal`) may arrive any number of times first.
pub trait ChatCallbacks: Send + Sync {
    /// An incremental fragment for the assistant message `message_id`
    fn on_token(&self, delta: &str, message_id: &str);

    fn on_error(&self, error: ChatError);

    fn on_complete(&self);

    fn on_connection_status(&self, _status: ConnectionStatus) {}
}

/// Turn progress tagged with the session that started it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Token {
        session_id: String,
        message_id: String,
        delta: String,
    },
    Error {
        session_id: String,
        error: ChatError,
    },
    Complete {
        session_id: String,
    },
    Status {
        session_id: String,
        status: ConnectionStatus,
    },
    /// The turn task has ended, whatever the outcome
    Finished {
        session_id: String,
    },
}

impl ChatEvent {
    pub fn session_id(&self) -> &str {
        match self {
            ChatEvent::Token { session_id, .. }
            | ChatEvent::Error { session_id, .. }
            | ChatEvent::Complete { session_id }
            | ChatEvent::Status { session_id, .. }
            | ChatEvent::Finished { session_id } => session_id,
        }
    }
}

/// Forwards callbacks onto a channel as `ChatEvent`s
#[derive(Debug, Clone)]
pub struct ChannelCallbacks {
    session_id: String,
    sender: mpsc::UnboundedSender<ChatEvent>,
}

impl ChannelCallbacks {
    pub fn new(session_id: impl Into<String>, sender: mpsc::UnboundedSender<ChatEvent>) -> Self {
        Self {
            session_id: session_id.into(),
            sender,
        }
    }

    fn send(&self, event: ChatEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!(
                target: "chatwire.chat",
                session_id = %self.session_id,
                "event receiver dropped"
            );
        }
    }

    /// Signal that the turn task has ended
    pub fn finished(&self) {
        self.send(ChatEvent::Finished {
            session_id: self.session_id.clone(),
        });
    }
}

impl ChatCallbacks for ChannelCallbacks {
    fn on_token(&self, delta: &str, message_id: &str) {
        self.send(ChatEvent::Token {
            session_id: self.session_id.clone(),
            message_id: message_id.to_string(),
            delta: delta.to_string(),
        });
    }

    fn on_error(&self, error: ChatError) {
        self.send(ChatEvent::Error {
            session_id: self.session_id.clone(),
            error,
        });
    }

    fn on_complete(&self) {
        self.send(ChatEvent::Complete {
            session_id: self.session_id.clone(),
        });
    }

    fn on_connection_status(&self, status: ConnectionStatus) {
        self.send(ChatEvent::Status {
            session_id: self.session_id.clone(),
            status,
        });
    }
}
