// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Server-sent events transport
//!
//! An `SseTransport` turns a POST request into a stream of SSE events.
//! `open` resolving successfully is the transport's "open" event; an error
//! result is its "error" event. Dropping the returned stream closes it.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

use crate::error::Result;

/// A streaming request to the chat backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseRequest {
    /// Fully built endpoint URL
    pub url: String,
    /// JSON request body
    pub body: String,
}

/// One decoded server-sent event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type (`message` when the server sent none)
    pub event: String,
    /// Event payload
    pub data: String,
    /// Last event id
    pub id: String,
}

impl SseEvent {
    /// Build a `message` event carrying `data`
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            event: "message".to_string(),
            data: data.into(),
            id: String::new(),
        }
    }
}

/// Transport-level failures, before or after the stream opened
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be sent
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status
    #[error("server responded with status {status}")]
    Status { status: u16, body: String },

    /// The open stream failed while reading
    #[error("stream error: {0}")]
    Stream(String),
}

/// Stream of events from an open connection. Ends when the server closes it.
pub type SseEventStream =
    Pin<Box<dyn Stream<Item = std::result::Result<SseEvent, TransportError>> + Send>>;

/// Abstraction over the HTTP layer that produces SSE streams
#[async_trait]
pub trait SseTransport: Send + Sync {
    /// Send the request and wait until the event stream is open.
    async fn open(
        &self,
        request: &SseRequest,
    ) -> std::result::Result<SseEventStream, TransportError>;
}

/// reqwest-backed SSE transport
#[derive(Clone)]
pub struct HttpSseTransport {
    client: Client,
}

impl HttpSseTransport {
    /// Create a transport whose TCP connect is bounded by `socket_timeout`
    pub fn new(socket_timeout: Duration) -> Result<Self> {
        let client = Client::builder().connect_timeout(socket_timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SseTransport for HttpSseTransport {
    async fn open(
        &self,
        request: &SseRequest,
    ) -> std::result::Result<SseEventStream, TransportError> {
        let response = self
            .client
            .post(&request.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let events = response.bytes_stream().eventsource().map(|item| {
            item.map(|event| SseEvent {
                event: event.event,
                data: event.data,
                id: event.id,
            })
            .map_err(|e| TransportError::Stream(e.to_string()))
        });

        Ok(Box::pin(events))
    }
}
