// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! SSE connection lifecycle: open, per-attempt timeout, retry with backoff, close.
//!
//! Each attempt runs `Idle -> Connecting -> {Connected | Failed}`. Only one
//! attempt is live at a time; its timeout is dropped together with it before
//! the next attempt starts.

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::settings::NetworkConfig;
use crate::error::ChatError;

use super::retry::BackoffPolicy;
use super::sse::{SseEvent, SseEventStream, SseRequest, SseTransport, TransportError};
use super::status::{ConnectionStatus, StatusReporter};

/// An open event stream
pub struct Connection {
    url: String,
    events: SseEventStream,
    retry_count: u32,
}

impl Connection {
    /// Next inbound event; `None` once the server closed the stream.
    pub async fn next_event(&mut self) -> Option<Result<SseEvent, TransportError>> {
        self.events.next().await
    }

    /// Retry count of the attempt that opened this connection
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Close the underlying transport.
    pub fn close(self) {
        tracing::debug!(
            target: "chatwire.transport",
            url = %self.url,
            action = "connection_closed",
            "closing SSE connection"
        );
    }
}

/// Owns connection establishment for one streaming request at a time
#[derive(Clone)]
pub struct SseConnectionManager {
    transport: Arc<dyn SseTransport>,
    policy: BackoffPolicy,
    connection_timeout: Duration,
}

impl SseConnectionManager {
    pub fn new(
        transport: Arc<dyn SseTransport>,
        policy: BackoffPolicy,
        connection_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            policy,
            connection_timeout,
        }
    }

    /// Build a manager using the configured retry policy and connection timeout
    pub fn from_config(transport: Arc<dyn SseTransport>, network: &NetworkConfig) -> Self {
        Self::new(
            transport,
            BackoffPolicy::from(&network.retry),
            network.timeouts.connection(),
        )
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Open a connection, retrying transport errors with exponential backoff.
    ///
    /// Reports `connecting` on the first attempt and `reconnecting` on each retry,
    /// `connected` once open, and `disconnected` when the retry budget runs out.
    /// A per-attempt timeout fails the whole call with `ConnectionTimeout`.
    pub async fn connect(
        &self,
        request: &SseRequest,
        status: &StatusReporter<'_>,
        cancel: &CancellationToken,
    ) -> Result<Connection, ChatError> {
        let mut retry_count: u32 = 0;

        loop {
            status.report(if retry_count == 0 {
                ConnectionStatus::Connecting
            } else {
                ConnectionStatus::Reconnecting
            });

            tracing::info!(
                target: "chatwire.transport",
                url = %request.url,
                retry_count,
                action = "create_connection",
                "creating SSE connection"
            );

            let attempt = tokio::time::timeout(self.connection_timeout, self.transport.open(request));
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ChatError::Cancelled),
                outcome = attempt => outcome,
            };

            let error = match outcome {
                Ok(Ok(events)) => {
                    status.report(ConnectionStatus::Connected);
                    tracing::info!(
                        target: "chatwire.transport",
                        url = %request.url,
                        retry_count,
                        action = "connection_established",
                        "SSE connection established"
                    );
                    return Ok(Connection {
                        url: request.url.clone(),
                        events,
                        retry_count,
                    });
                }
                Ok(Err(error)) => error,
                Err(_elapsed) => {
                    tracing::error!(
                        target: "chatwire.transport",
                        url = %request.url,
                        retry_count,
                        timeout_ms = self.connection_timeout.as_millis() as u64,
                        action = "connection_timeout",
                        "connection timeout"
                    );
                    return Err(ChatError::ConnectionTimeout);
                }
            };

            tracing::error!(
                target: "chatwire.transport",
                url = %request.url,
                retry_count,
                error = %error,
                action = "connection_error",
                "SSE connection error"
            );

            if !self.policy.should_retry(retry_count) {
                status.report(ConnectionStatus::Disconnected);
                tracing::error!(
                    target: "chatwire.transport",
                    max_attempts = self.policy.max_attempts,
                    action = "connection_failed",
                    "connection failed after max retry attempts"
                );
                return Err(ChatError::ConnectionFailed);
            }

            let delay = self.policy.delay_for(retry_count);
            tracing::info!(
                target: "chatwire.transport",
                retry_count = retry_count + 1,
                delay_ms = delay.as_millis() as u64,
                action = "connection_retry",
                "retrying connection"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ChatError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            retry_count += 1;
        }
    }
}
