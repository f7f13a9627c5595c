// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Admission control for streaming turns
//!
//! Caps the number of streams in flight and the number of turns started per
//! sliding one-minute window. Neither limit waits: a turn over either limit
//! fails immediately.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use crate::config::settings::RateLimitsConfig;
use crate::error::ChatError;

const WINDOW: Duration = Duration::from_secs(60);

/// Held for the lifetime of one stream
#[derive(Debug)]
pub struct StreamPermit {
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug, Clone)]
pub struct StreamLimiter {
    streams: Arc<Semaphore>,
    requests_per_minute: usize,
    started: Arc<Mutex<VecDeque<Instant>>>,
}

impl StreamLimiter {
    pub fn new(concurrent_streams: usize, requests_per_minute: usize) -> Self {
        Self {
            streams: Arc::new(Semaphore::new(concurrent_streams)),
            requests_per_minute,
            started: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn from_config(config: &RateLimitsConfig) -> Self {
        Self::new(
            config.concurrent_streams as usize,
            config.requests_per_minute as usize,
        )
    }

    /// Admit one turn, or fail with `ConcurrentLimit` / `RateLimited`.
    pub fn try_acquire(&self) -> Result<StreamPermit, ChatError> {
        let permit = self.streams.clone().try_acquire_owned().map_err(|_| {
            tracing::warn!(
                target: "chatwire.chat",
                action = "concurrent_limit",
                "concurrent stream limit reached"
            );
            ChatError::ConcurrentLimit
        })?;

        let now = Instant::now();
        let mut started = self
            .started
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while started
            .front()
            .is_some_and(|first| now.duration_since(*first) >= WINDOW)
        {
            started.pop_front();
        }
        if started.len() >= self.requests_per_minute {
            tracing::warn!(
                target: "chatwire.chat",
                requests_per_minute = self.requests_per_minute,
                action = "rate_limited",
                "request rate limit reached"
            );
            return Err(ChatError::RateLimited);
        }
        started.push_back(now);

        Ok(StreamPermit { _permit: permit })
    }
}
