// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat session controller
//!
//! Owns the conversation for a front end. At most one assistant turn runs at
//! a time; events from a turn started before the last `clear` are dropped.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{ChatError, Result, SessionError};
use crate::transport::status::ConnectionStatus;

use super::callbacks::{ChannelCallbacks, ChatCallbacks, ChatEvent};
use super::message::{Conversation, Message};
use super::service::{ChatOptions, ChatService};
use super::validation::MessageValidator;

pub struct ChatSession {
    service: ChatService,
    validator: MessageValidator,
    conversation: Conversation,
    options: ChatOptions,
    loading: bool,
    cancel: Option<CancellationToken>,
    /// Task of the latest turn; a cleared turn may still be unwinding
    turn: Option<JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<ChatEvent>,
    events_rx: mpsc::UnboundedReceiver<ChatEvent>,
    last_status: Option<ConnectionStatus>,
}

impl ChatSession {
    pub fn new(service: ChatService, validator: MessageValidator) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            service,
            validator,
            conversation: Conversation::new(),
            options: ChatOptions::default(),
            loading: false,
            cancel: None,
            turn: None,
            events_tx,
            events_rx,
            last_status: None,
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn session_id(&self) -> &str {
        self.conversation.session_id()
    }

    /// Whether an assistant turn is in flight
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_status(&self) -> Option<ConnectionStatus> {
        self.last_status
    }

    /// Provider the next turn will use
    pub fn provider(&self) -> String {
        self.service.resolve_provider(self.options.provider.as_deref())
    }

    /// Select a provider for later turns. Unknown ids are rejected.
    pub fn set_provider(&mut self, provider: &str) -> bool {
        if !self.service.registry().contains(provider) {
            return false;
        }
        self.options.provider = Some(provider.to_string());
        true
    }

    /// Validate `input`, append it and start an assistant turn.
    pub fn send(&mut self, input: &str) -> Result<()> {
        if self.loading {
            return Err(SessionError::TurnInProgress.into());
        }

        let message = self.validator.prepare_user_message(input)?;
        let mut history = self.conversation.messages().to_vec();
        history.push(message.clone());
        if let Some(error) = self.validator.validate_history(&history) {
            tracing::debug!(target: "chatwire.chat", code = error.code(), "history rejected");
            return Err(error.into());
        }

        self.conversation.push(message);
        self.loading = true;

        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());

        let callbacks = ChannelCallbacks::new(self.session_id(), self.events_tx.clone());
        let service = self.service.clone();
        let options = self.options.clone();
        let previous = self.turn.take();

        let handle = tokio::spawn(async move {
            // The cleared turn holds its stream permit until it returns
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            let turn_callbacks = callbacks.clone();
            let turn = tokio::spawn(async move {
                service
                    .stream_chat(&history, &options, &turn_callbacks, cancel)
                    .await
            });
            if let Err(error) = turn.await {
                if error.is_panic() {
                    tracing::error!(target: "chatwire.chat", "chat turn panicked");
                    callbacks.on_error(ChatError::UnknownError(
                        "Chat turn ended unexpectedly".to_string(),
                    ));
                }
            }
            callbacks.finished();
        });
        self.turn = Some(handle);

        Ok(())
    }

    /// Wait for the next event of the current session and fold it into the
    /// conversation. Events from earlier sessions are skipped.
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        loop {
            let event = self.events_rx.recv().await?;
            if event.session_id() != self.conversation.session_id() {
                tracing::debug!(
                    target: "chatwire.chat",
                    stale_session = %event.session_id(),
                    "ignoring event from cleared session"
                );
                continue;
            }
            self.apply(&event);
            return Some(event);
        }
    }

    fn apply(&mut self, event: &ChatEvent) {
        match event {
            ChatEvent::Token {
                message_id, delta, ..
            } => self.conversation.apply_token(message_id, delta),
            ChatEvent::Status { status, .. } => self.last_status = Some(*status),
            ChatEvent::Complete { .. } => self.conversation.close_turn(),
            ChatEvent::Error { error, .. } => {
                if error.is_terminal() {
                    self.conversation.close_turn();
                }
            }
            ChatEvent::Finished { .. } => {
                self.conversation.close_turn();
                self.loading = false;
                self.cancel = None;
            }
        }
    }

    /// Drive events until the current turn ends, returning its terminal error if any.
    pub async fn wait_for_turn(&mut self) -> Option<ChatError> {
        let mut failure = None;
        while self.loading {
            match self.next_event().await {
                Some(ChatEvent::Error { error, .. }) if error.is_terminal() => {
                    failure = Some(error)
                }
                Some(_) => {}
                None => break,
            }
        }
        failure
    }

    /// Abort the in-flight turn, if any, and start a fresh conversation.
    pub fn clear(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.conversation.clear();
        self.loading = false;
        self.last_status = None;
        tracing::info!(
            target: "chatwire.chat",
            session_id = %self.conversation.session_id(),
            "conversation cleared"
        );
    }
}
