// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Streaming response handling
//!
//! Payload parsing and per-message token accumulation, kept apart from the
//! I/O so both can be tested without a connection.

use serde::Deserialize;
use std::collections::HashMap;

/// Sentinel payload marking the end of a turn
pub const DONE_SENTINEL: &str = "[DONE]";

/// One incremental fragment of an assistant message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamToken {
    pub message_id: String,
    pub delta_content: String,
}

/// What a single event payload means for the turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPayload {
    /// Nothing to deliver (keep-alive or empty delta)
    Empty,
    /// The turn is complete
    Done,
    /// A token to deliver
    Token(StreamToken),
}

/// Why a payload could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadError {
    pub reason: String,
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

#[derive(Deserialize)]
struct WirePayload {
    id: Option<String>,
    delta: Option<WireDelta>,
}

#[derive(Deserialize)]
struct WireDelta {
    content: Option<String>,
}

/// Parse the `data` field of one inbound event.
///
/// Only `id` and `delta.content` are read; other fields are ignored.
pub fn parse_payload(data: &str) -> Result<StreamPayload, PayloadError> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(StreamPayload::Empty);
    }
    if data == DONE_SENTINEL {
        return Ok(StreamPayload::Done);
    }

    let payload: WirePayload = serde_json::from_str(data).map_err(|e| PayloadError {
        reason: format!("invalid JSON: {}", e),
    })?;

    let message_id = payload.id.ok_or_else(|| PayloadError {
        reason: "missing field `id`".to_string(),
    })?;
    let delta_content = payload
        .delta
        .and_then(|delta| delta.content)
        .ok_or_else(|| PayloadError {
            reason: "missing field `delta.content`".to_string(),
        })?;

    if delta_content.is_empty() {
        return Ok(StreamPayload::Empty);
    }

    Ok(StreamPayload::Token(StreamToken {
        message_id,
        delta_content,
    }))
}

/// Truncate a payload for logging
pub fn payload_preview(data: &str) -> String {
    match data.char_indices().nth(100) {
        Some((index, _)) => format!("{}...", &data[..index]),
        None => data.to_string(),
    }
}

/// Accumulated content per message id for one turn
#[derive(Debug, Default)]
pub struct TokenAccumulator {
    buffers: HashMap<String, String>,
    /// Message ids in first-seen order
    order: Vec<String>,
    token_count: usize,
}

impl TokenAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a token into its message buffer
    pub fn push(&mut self, token: &StreamToken) {
        self.token_count += 1;
        if !self.buffers.contains_key(&token.message_id) {
            self.order.push(token.message_id.clone());
        }
        self.buffers
            .entry(token.message_id.clone())
            .or_default()
            .push_str(&token.delta_content);
    }

    /// Total tokens received this turn
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Consume the accumulator, returning `(message_id, content)` pairs in order
    pub fn finish(mut self) -> Vec<(String, String)> {
        self.order
            .drain(..)
            .map(|id| {
                let content = self.buffers.remove(&id).unwrap_or_default();
                (id, content)
            })
            .collect()
    }
}
