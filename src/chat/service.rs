// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Streaming chat orchestration
//!
//! One turn is driven by a single task through
//! `Idle -> Connecting -> Streaming -> {Completed | Failed}`. The stream
//! deadline is armed when the turn starts and covers connection retries as
//! well as streaming; it is dropped as soon as the turn reaches a terminal
//! state.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::settings::Settings;
use crate::error::{ChatError, ChatwireError, Result};
use crate::providers::ProviderRegistry;
use crate::transport::{
    Connection, ConnectionStatus, HttpSseTransport, SseConnectionManager, SseEvent, SseRequest,
    SseTransport, StatusReporter, TransportError,
};

use super::callbacks::ChatCallbacks;
use super::limits::StreamLimiter;
use super::message::Message;
use super::streaming::{parse_payload, payload_preview, StreamPayload, TokenAccumulator};

/// Tokens between progress log lines
const TOKEN_LOG_INTERVAL: usize = 50;

/// Per-turn options
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Requested provider id; unknown or absent resolves to the default
    pub provider: Option<String>,
    /// Advisory; logged with the turn, not sent on the wire
    pub temperature: Option<f32>,
    /// When false the turn is served by one non-streaming request
    pub streaming: bool,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            provider: None,
            temperature: None,
            streaming: true,
        }
    }
}

impl ChatOptions {
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed(ChatError),
    /// Cancelled by the caller; no terminal callback fired
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnState {
    Idle,
    Connecting,
    Streaming,
    Completed,
    Failed,
}

/// Tracks the state of one turn and logs transitions
struct Turn {
    provider: String,
    state: TurnState,
}

impl Turn {
    fn new(provider: String) -> Self {
        Self {
            provider,
            state: TurnState::Idle,
        }
    }

    fn transition(&mut self, next: TurnState) {
        tracing::trace!(
            target: "chatwire.chat",
            provider = %self.provider,
            from = ?self.state,
            to = ?next,
            "turn state"
        );
        self.state = next;
    }
}

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    messages: &'a [Message],
}

/// One wake-up of the streaming loop
enum Step {
    Cancelled,
    Deadline,
    Event(Option<std::result::Result<SseEvent, TransportError>>),
}

/// Next event of an open connection; never resolves once the connection is gone
async fn next_event(
    connection: &mut Option<Connection>,
) -> Option<std::result::Result<SseEvent, TransportError>> {
    match connection {
        Some(connection) => connection.next_event().await,
        None => futures::future::pending().await,
    }
}

/// Entry point for chat turns
#[derive(Clone)]
pub struct ChatService {
    registry: Arc<ProviderRegistry>,
    connections: SseConnectionManager,
    limiter: StreamLimiter,
    http: Client,
    base_url: Option<String>,
    stream_timeout: Duration,
    request_timeout: Duration,
}

impl ChatService {
    /// Build a service over an explicit transport
    pub fn new(
        settings: &Settings,
        registry: Arc<ProviderRegistry>,
        transport: Arc<dyn SseTransport>,
    ) -> Self {
        Self {
            registry,
            connections: SseConnectionManager::from_config(transport, &settings.network),
            limiter: StreamLimiter::from_config(&settings.network.rate_limits),
            http: Client::new(),
            base_url: settings.api.base_url().map(str::to_string),
            stream_timeout: settings.network.timeouts.stream(),
            request_timeout: settings.network.timeouts.api_request(),
        }
    }

    /// Build a service that talks to the configured backend over HTTP
    pub fn from_settings(settings: &Settings, registry: Arc<ProviderRegistry>) -> Result<Self> {
        let socket_timeout = settings.network.timeouts.socket();
        let transport = HttpSseTransport::new(socket_timeout)?;
        let mut service = Self::new(settings, registry, Arc::new(transport));
        service.http = Client::builder().connect_timeout(socket_timeout).build()?;
        Ok(service)
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Resolve a provider id without starting a turn
    pub fn resolve_provider(&self, requested: Option<&str>) -> String {
        self.registry.resolve(requested)
    }

    /// `{base}/chat/{provider}`
    fn endpoint(&self, provider: &str) -> Result<Url> {
        let base = self.base_url.as_deref().ok_or_else(|| {
            ChatwireError::Config(
                "API base URL is not configured. Set CHATWIRE_DEV_API_URL or CHATWIRE_PROD_API_URL."
                    .to_string(),
            )
        })?;
        let url = format!("{}/chat/{}", base.trim_end_matches('/'), provider);
        Url::parse(&url).map_err(|e| ChatwireError::Config(format!("Invalid API URL {}: {}", url, e)))
    }

    /// Request body after provider-specific shaping
    fn request_body(&self, provider: &str, messages: &[Message]) -> Result<String> {
        let prepared = match self.registry.get(provider) {
            Some(provider) => provider.prepare_messages(messages),
            None => messages.to_vec(),
        };
        Ok(serde_json::to_string(&ChatRequestBody {
            messages: &prepared,
        })?)
    }

    fn build_request(&self, provider: &str, messages: &[Message]) -> Result<SseRequest> {
        Ok(SseRequest {
            url: self.endpoint(provider)?.to_string(),
            body: self.request_body(provider, messages)?,
        })
    }

    fn fail(&self, turn: &mut Turn, callbacks: &dyn ChatCallbacks, error: ChatError) -> TurnOutcome {
        turn.transition(TurnState::Failed);
        tracing::error!(
            target: "chatwire.chat",
            provider = %turn.provider,
            code = error.code(),
            error = %error,
            action = "stream_chat",
            "chat turn failed"
        );
        callbacks.on_error(error.clone());
        TurnOutcome::Failed(error)
    }

    /// Run one chat turn, reporting progress through `callbacks`.
    ///
    /// Every failure, setup included, is delivered through `on_error`; the
    /// returned outcome mirrors what the callbacks saw.
    pub async fn stream_chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
        callbacks: &dyn ChatCallbacks,
        cancel: CancellationToken,
    ) -> TurnOutcome {
        let provider = self.registry.resolve(options.provider.as_deref());
        let mut turn = Turn::new(provider.clone());

        let _permit = match self.limiter.try_acquire() {
            Ok(permit) => permit,
            Err(error) => return self.fail(&mut turn, callbacks, error),
        };

        if !options.streaming {
            return self
                .complete_once(&mut turn, messages, callbacks, cancel)
                .await;
        }

        let request = match self.build_request(&provider, messages) {
            Ok(request) => request,
            Err(error) => return self.fail(&mut turn, callbacks, error.into_chat_error()),
        };

        tracing::info!(
            target: "chatwire.chat",
            provider = %provider,
            message_count = messages.len(),
            temperature = ?options.temperature,
            action = "stream_chat",
            "starting chat stream"
        );

        let deadline = tokio::time::sleep(self.stream_timeout);
        tokio::pin!(deadline);

        let report_status = |status: ConnectionStatus| callbacks.on_connection_status(status);
        let status = StatusReporter::new(&report_status);

        turn.transition(TurnState::Connecting);
        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ChatError::Cancelled),
            _ = &mut deadline => Err(ChatError::StreamTimeout),
            result = self.connections.connect(&request, &status, &cancel) => result,
        };
        let mut connection = match connected {
            Ok(connection) => Some(connection),
            Err(ChatError::Cancelled) => {
                tracing::info!(target: "chatwire.chat", provider = %provider, "chat turn cancelled");
                return TurnOutcome::Cancelled;
            }
            Err(error) => return self.fail(&mut turn, callbacks, error),
        };

        turn.transition(TurnState::Streaming);
        let mut tokens = TokenAccumulator::new();

        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                _ = &mut deadline => Step::Deadline,
                event = next_event(&mut connection) => Step::Event(event),
            };

            match step {
                Step::Cancelled => {
                    if let Some(connection) = connection.take() {
                        connection.close();
                    }
                    tracing::info!(target: "chatwire.chat", provider = %provider, "chat turn cancelled");
                    return TurnOutcome::Cancelled;
                }
                Step::Deadline => {
                    if let Some(connection) = connection.take() {
                        connection.close();
                    }
                    tracing::error!(
                        target: "chatwire.chat",
                        provider = %provider,
                        timeout_ms = self.stream_timeout.as_millis() as u64,
                        token_count = tokens.token_count(),
                        action = "stream_timeout",
                        "stream timed out before completion"
                    );
                    return self.fail(&mut turn, callbacks, ChatError::StreamTimeout);
                }
                Step::Event(Some(Ok(event))) => match parse_payload(&event.data) {
                    Ok(StreamPayload::Done) => {
                        turn.transition(TurnState::Completed);
                        if let Some(connection) = connection.take() {
                            connection.close();
                        }
                        tracing::info!(
                            target: "chatwire.chat",
                            provider = %provider,
                            token_count = tokens.token_count(),
                            action = "stream_complete",
                            "chat stream completed"
                        );
                        for (message_id, content) in tokens.finish() {
                            tracing::debug!(
                                target: "chatwire.chat",
                                message_id = %message_id,
                                content_length = content.chars().count(),
                                action = "stream_complete",
                                "assistant message received"
                            );
                        }
                        callbacks.on_complete();
                        return TurnOutcome::Completed;
                    }
                    Ok(StreamPayload::Empty) => {}
                    Ok(StreamPayload::Token(token)) => {
                        tokens.push(&token);
                        let count = tokens.token_count();
                        if count == 1 || count % TOKEN_LOG_INTERVAL == 0 {
                            tracing::debug!(
                                target: "chatwire.chat",
                                message_id = %token.message_id,
                                token_count = count,
                                action = "token_received",
                                "received token"
                            );
                        }
                        callbacks.on_token(&token.delta_content, &token.message_id);
                    }
                    Err(error) => {
                        tracing::warn!(
                            target: "chatwire.chat",
                            reason = %error,
                            payload = %payload_preview(&event.data),
                            action = "parse_error",
                            "failed to parse stream event"
                        );
                        callbacks.on_error(ChatError::ParseError);
                    }
                },
                Step::Event(Some(Err(error))) => {
                    tracing::error!(
                        target: "chatwire.chat",
                        provider = %provider,
                        error = %error,
                        action = "stream_error",
                        "stream error before completion"
                    );
                    if let Some(connection) = connection.take() {
                        connection.close();
                    }
                    status.report(ConnectionStatus::Disconnected);
                }
                Step::Event(None) => {
                    tracing::warn!(
                        target: "chatwire.chat",
                        provider = %provider,
                        token_count = tokens.token_count(),
                        action = "stream_closed",
                        "stream closed before completion"
                    );
                    if let Some(connection) = connection.take() {
                        connection.close();
                    }
                    status.report(ConnectionStatus::Disconnected);
                }
            }
        }
    }

    /// Serve a turn with a single non-streaming request
    async fn complete_once(
        &self,
        turn: &mut Turn,
        messages: &[Message],
        callbacks: &dyn ChatCallbacks,
        cancel: CancellationToken,
    ) -> TurnOutcome {
        turn.transition(TurnState::Connecting);
        let provider = turn.provider.clone();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return TurnOutcome::Cancelled,
            result = self.chat(messages, Some(&provider)) => result,
        };

        match result {
            Ok(content) => {
                turn.transition(TurnState::Completed);
                if !content.is_empty() {
                    let message_id = uuid::Uuid::new_v4().to_string();
                    callbacks.on_token(&content, &message_id);
                }
                callbacks.on_complete();
                TurnOutcome::Completed
            }
            Err(error) => self.fail(turn, callbacks, error),
        }
    }

    /// Non-streaming request, used as a health check.
    ///
    /// Returns the response's `content` field, or an empty string if absent.
    pub async fn chat(
        &self,
        messages: &[Message],
        provider: Option<&str>,
    ) -> std::result::Result<String, ChatError> {
        let provider = self.registry.resolve(provider);
        let url = self
            .endpoint(&provider)
            .map_err(ChatwireError::into_chat_error)?;
        let body = self
            .request_body(&provider, messages)
            .map_err(ChatwireError::into_chat_error)?;

        tracing::info!(
            target: "chatwire.chat",
            provider = %provider,
            url = %url,
            action = "chat_request",
            "sending chat request"
        );

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.request_timeout)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatError::ConnectionTimeout
                } else {
                    ChatError::RequestError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error = ChatError::HttpError {
                status: status.as_u16(),
                message: format!("Server responded with status: {}", status.as_u16()),
            };
            tracing::error!(
                target: "chatwire.chat",
                provider = %provider,
                status = status.as_u16(),
                action = "chat_request",
                "chat request failed"
            );
            return Err(error);
        }

        let payload: serde_json::Value = response.json().await.map_err(|e| {
            tracing::warn!(target: "chatwire.chat", error = %e, "invalid chat response body");
            ChatError::ParseError
        })?;

        Ok(payload
            .get("content")
            .and_then(|content| content.as_str())
            .unwrap_or_default()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::callbacks::recording::RecordingCallbacks;
    use crate::chat::message::Conversation;
    use crate::providers::{ConfiguredProvider, Provider};
    use crate::transport::mock::{ScriptedAttempt, ScriptedEvent, ScriptedTransport};

    const BASE: &str = "http://chat.test/api";

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.api.dev_url = Some(BASE.to_string());
        settings
    }

    fn service_with(settings: &Settings, transport: &ScriptedTransport) -> ChatService {
        let registry = Arc::new(ProviderRegistry::from_config(&settings.providers));
        ChatService::new(settings, registry, Arc::new(transport.clone()))
    }

    fn service(transport: &ScriptedTransport) -> ChatService {
        service_with(&settings(), transport)
    }

    async fn run(service: &ChatService, callbacks: &RecordingCallbacks) -> TurnOutcome {
        service
            .stream_chat(
                &[Message::user("Hi")],
                &ChatOptions::default(),
                callbacks,
                CancellationToken::new(),
            )
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_then_done() {
        let transport = ScriptedTransport::streaming([
            ScriptedEvent::token("m1", "Hel"),
            ScriptedEvent::token("m1", "lo"),
            ScriptedEvent::done(),
        ]);
        let callbacks = RecordingCallbacks::default();

        let outcome = run(&service(&transport), &callbacks).await;

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(
            callbacks.tokens(),
            vec![
                ("m1".to_string(), "Hel".to_string()),
                ("m1".to_string(), "lo".to_string())
            ]
        );
        assert_eq!(callbacks.completions(), 1);
        assert!(callbacks.errors().is_empty());
        assert_eq!(
            callbacks.statuses(),
            vec![ConnectionStatus::Connecting, ConnectionStatus::Connected]
        );
        assert_eq!(transport.closed_count(), 1);

        let mut conversation = Conversation::new();
        conversation.push(Message::user("Hi"));
        for (id, delta) in callbacks.tokens() {
            conversation.apply_token(&id, &delta);
        }
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.messages()[1].content, "Hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_targets_resolved_provider() {
        let transport = ScriptedTransport::streaming([ScriptedEvent::done()]);
        let service = service(&transport);
        let callbacks = RecordingCallbacks::default();

        service
            .stream_chat(
                &[Message::user("Hi")],
                &ChatOptions {
                    temperature: Some(0.2),
                    ..ChatOptions::default().with_provider("nonexistent")
                },
                &callbacks,
                CancellationToken::new(),
            )
            .await;

        let requests = transport.requests();
        assert_eq!(requests[0].url, "http://chat.test/api/chat/gpt");
        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["messages"]);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hi");
        assert!(body["messages"][0]["timestamp"].is_i64());
    }

    #[tokio::test(start_paused = true)]
    async fn test_parse_error_does_not_end_turn() {
        let transport = ScriptedTransport::streaming([
            ScriptedEvent::data("not json"),
            ScriptedEvent::data(r#"{"id":"m1"}"#),
            ScriptedEvent::token("m1", "ok"),
            ScriptedEvent::done(),
        ]);
        let callbacks = RecordingCallbacks::default();

        let outcome = run(&service(&transport), &callbacks).await;

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(
            callbacks.errors(),
            vec![ChatError::ParseError, ChatError::ParseError]
        );
        assert_eq!(callbacks.tokens().len(), 1);
        assert_eq!(callbacks.terminal_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_failure_reports_once() {
        let transport = ScriptedTransport::always_failing();
        let callbacks = RecordingCallbacks::default();

        let outcome = run(&service(&transport), &callbacks).await;

        assert_eq!(outcome, TurnOutcome::Failed(ChatError::ConnectionFailed));
        assert_eq!(callbacks.errors(), vec![ChatError::ConnectionFailed]);
        assert_eq!(callbacks.completions(), 0);
        assert_eq!(transport.attempt_count(), 4);
        assert_eq!(
            callbacks.statuses().last(),
            Some(&ConnectionStatus::Disconnected)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_deadline_outlives_retries() {
        // Backoff of 1s + 2s + 4s fits inside the default 60s deadline
        let transport = ScriptedTransport::new([
            ScriptedAttempt::Fail(TransportError::Request("refused".into())),
            ScriptedAttempt::Fail(TransportError::Request("refused".into())),
            ScriptedAttempt::Fail(TransportError::Request("refused".into())),
            ScriptedAttempt::Open(vec![ScriptedEvent::token("m1", "late"), ScriptedEvent::done()]),
        ]);
        let callbacks = RecordingCallbacks::default();

        let outcome = run(&service(&transport), &callbacks).await;

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(callbacks.tokens().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_deadline_fires_during_slow_stream() {
        let transport = ScriptedTransport::streaming([
            ScriptedEvent::token("m1", "partial"),
            ScriptedEvent::Pending,
        ]);
        let callbacks = RecordingCallbacks::default();
        let start = tokio::time::Instant::now();

        let outcome = run(&service(&transport), &callbacks).await;

        assert_eq!(outcome, TurnOutcome::Failed(ChatError::StreamTimeout));
        assert_eq!(callbacks.errors(), vec![ChatError::StreamTimeout]);
        assert_eq!(callbacks.completions(), 0);
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(transport.closed_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_suppresses_deadline() {
        let transport = ScriptedTransport::streaming([
            ScriptedEvent::Delay(Duration::from_secs(59)),
            ScriptedEvent::done(),
        ]);
        let callbacks = RecordingCallbacks::default();

        let outcome = run(&service(&transport), &callbacks).await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(outcome, TurnOutcome::Completed);
        assert!(callbacks.errors().is_empty());
        assert_eq!(callbacks.terminal_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_before_done_reports_disconnected_then_times_out() {
        let transport = ScriptedTransport::streaming([ScriptedEvent::token("m1", "cut")]);
        let callbacks = RecordingCallbacks::default();

        let outcome = run(&service(&transport), &callbacks).await;

        assert_eq!(outcome, TurnOutcome::Failed(ChatError::StreamTimeout));
        assert_eq!(
            callbacks.statuses(),
            vec![
                ConnectionStatus::Connecting,
                ConnectionStatus::Connected,
                ConnectionStatus::Disconnected
            ]
        );
        assert_eq!(callbacks.terminal_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_error_mid_turn_disconnects_then_times_out() {
        let transport = ScriptedTransport::streaming([
            ScriptedEvent::token("m1", "half"),
            ScriptedEvent::Error("connection reset".to_string()),
            ScriptedEvent::Pending,
        ]);
        let callbacks = RecordingCallbacks::default();
        let started = tokio::time::Instant::now();

        let outcome = run(&service(&transport), &callbacks).await;

        assert_eq!(outcome, TurnOutcome::Failed(ChatError::StreamTimeout));
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert_eq!(callbacks.errors(), vec![ChatError::StreamTimeout]);
        assert_eq!(callbacks.completions(), 0);
        assert_eq!(callbacks.tokens().len(), 1);
        assert_eq!(
            callbacks.statuses().last(),
            Some(&ConnectionStatus::Disconnected)
        );
        assert_eq!(transport.closed_count(), 1);
        assert_eq!(transport.attempt_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_timeout_is_terminal() {
        let transport = ScriptedTransport::new([ScriptedAttempt::Hang]);
        let callbacks = RecordingCallbacks::default();

        let outcome = run(&service(&transport), &callbacks).await;

        assert_eq!(outcome, TurnOutcome::Failed(ChatError::ConnectionTimeout));
        assert_eq!(transport.attempt_count(), 1);
        assert_eq!(callbacks.terminal_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_stream_closes_without_callbacks() {
        let transport = ScriptedTransport::streaming([
            ScriptedEvent::token("m1", "a"),
            ScriptedEvent::Pending,
        ]);
        let service = service(&transport);
        let callbacks = RecordingCallbacks::default();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let outcome = service
            .stream_chat(&[Message::user("Hi")], &ChatOptions::default(), &callbacks, cancel)
            .await;

        assert_eq!(outcome, TurnOutcome::Cancelled);
        assert_eq!(callbacks.terminal_count(), 0);
        assert_eq!(transport.closed_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_base_url_is_request_error() {
        let transport = ScriptedTransport::streaming([ScriptedEvent::done()]);
        let service = service_with(&Settings::default(), &transport);
        let callbacks = RecordingCallbacks::default();

        let outcome = run(&service, &callbacks).await;

        match outcome {
            TurnOutcome::Failed(ChatError::RequestError(message)) => {
                assert!(message.contains("base URL"))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(transport.attempt_count(), 0);
        assert_eq!(callbacks.terminal_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_limit_enforced() {
        let mut settings = settings();
        settings.network.rate_limits.concurrent_streams = 1;
        let transport = ScriptedTransport::streaming([ScriptedEvent::Pending]);
        let service = service_with(&settings, &transport);

        let cancel = CancellationToken::new();
        let first_service = service.clone();
        let first_cancel = cancel.clone();
        let first = tokio::spawn(async move {
            let callbacks = RecordingCallbacks::default();
            first_service
                .stream_chat(&[Message::user("one")], &ChatOptions::default(), &callbacks, first_cancel)
                .await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let callbacks = RecordingCallbacks::default();
        let outcome = run(&service, &callbacks).await;
        assert_eq!(outcome, TurnOutcome::Failed(ChatError::ConcurrentLimit));

        cancel.cancel();
        assert_eq!(first.await.unwrap(), TurnOutcome::Cancelled);
    }

    struct SystemPromptProvider;

    impl Provider for SystemPromptProvider {
        fn id(&self) -> &str {
            "gpt"
        }

        fn display_name(&self) -> &str {
            "GPT"
        }

        fn prepare_messages(&self, messages: &[Message]) -> Vec<Message> {
            let mut prepared = vec![Message::system("Be brief")];
            prepared.extend_from_slice(messages);
            prepared
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_shapes_outbound_messages() {
        let transport = ScriptedTransport::streaming([ScriptedEvent::done()]);
        let service = service(&transport);
        service.registry().register(Arc::new(SystemPromptProvider));
        service
            .registry()
            .register(Arc::new(ConfiguredProvider::new("claude", "Claude", "anthropic")));

        run(&service, &RecordingCallbacks::default()).await;

        let body: serde_json::Value = serde_json::from_str(&transport.requests()[0].body).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hi");
    }
}
