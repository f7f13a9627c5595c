// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Scripted SSE transport for testing
//!
//! Each call to `open` consumes the next scripted attempt. Once the script
//! runs out every further attempt fails.

use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use super::sse::{SseEvent, SseEventStream, SseRequest, SseTransport, TransportError};

/// What a single connection attempt does
#[derive(Debug, Clone)]
pub enum ScriptedAttempt {
    /// Fail before opening
    Fail(TransportError),
    /// Never open and never fail
    Hang,
    /// Open, then play the events in order and close
    Open(Vec<ScriptedEvent>),
}

/// One step of an open stream
#[derive(Debug, Clone)]
pub enum ScriptedEvent {
    /// Deliver a `message` event with this payload
    Data(String),
    /// Deliver a stream error
    Error(String),
    /// Wait before the next step
    Delay(Duration),
    /// Stay open without delivering anything else
    Pending,
}

impl ScriptedEvent {
    pub fn data(payload: impl Into<String>) -> Self {
        ScriptedEvent::Data(payload.into())
    }

    /// A token payload in the backend's wire format
    pub fn token(message_id: &str, content: &str) -> Self {
        ScriptedEvent::Data(
            serde_json::json!({ "id": message_id, "delta": { "content": content } }).to_string(),
        )
    }

    /// The completion sentinel
    pub fn done() -> Self {
        ScriptedEvent::Data("[DONE]".to_string())
    }
}

/// A transport that replays a fixed script
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    attempts: Arc<Mutex<VecDeque<ScriptedAttempt>>>,
    requests: Arc<Mutex<Vec<SseRequest>>>,
    opened_at: Arc<Mutex<Vec<Instant>>>,
    closed: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new(attempts: impl IntoIterator<Item = ScriptedAttempt>) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(attempts.into_iter().collect())),
            ..Self::default()
        }
    }

    /// A transport whose every attempt fails
    pub fn always_failing() -> Self {
        Self::new([])
    }

    /// A transport that opens once and plays `events`
    pub fn streaming(events: impl IntoIterator<Item = ScriptedEvent>) -> Self {
        Self::new([ScriptedAttempt::Open(events.into_iter().collect())])
    }

    /// Number of `open` calls so far
    pub fn attempt_count(&self) -> usize {
        lock(&self.opened_at).len()
    }

    /// Instants at which each `open` call started
    pub fn attempt_instants(&self) -> Vec<Instant> {
        lock(&self.opened_at).clone()
    }

    /// Requests received, in order
    pub fn requests(&self) -> Vec<SseRequest> {
        lock(&self.requests).clone()
    }

    /// Number of opened streams that have since been dropped
    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Scripted transport lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Counts a close when the stream owning it is dropped
struct CloseGuard(Arc<AtomicUsize>);

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SseTransport for ScriptedTransport {
    async fn open(
        &self,
        request: &SseRequest,
    ) -> std::result::Result<SseEventStream, TransportError> {
        lock(&self.opened_at).push(Instant::now());
        lock(&self.requests).push(request.clone());

        let next = lock(&self.attempts).pop_front();
        let events = match next {
            None => {
                return Err(TransportError::Request(
                    "scripted transport exhausted".to_string(),
                ))
            }
            Some(ScriptedAttempt::Fail(err)) => return Err(err),
            Some(ScriptedAttempt::Hang) => futures::future::pending().await,
            Some(ScriptedAttempt::Open(events)) => events,
        };

        let guard = CloseGuard(self.closed.clone());
        let state = (VecDeque::from(events), guard);
        let stream = stream::unfold(state, |(mut steps, guard)| async move {
            loop {
                match steps.pop_front()? {
                    ScriptedEvent::Data(data) => {
                        return Some((Ok(SseEvent::message(data)), (steps, guard)))
                    }
                    ScriptedEvent::Error(message) => {
                        return Some((Err(TransportError::Stream(message)), (steps, guard)))
                    }
                    ScriptedEvent::Delay(duration) => tokio::time::sleep(duration).await,
                    ScriptedEvent::Pending => futures::future::pending::<()>().await,
                }
            }
        });

        Ok(Box::pin(stream))
    }
}
