// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Exponential backoff for connection retries

use crate::config::settings::ResilienceConfig;
use rand::Rng;
use std::time::Duration;

/// Backoff policy with smart defaults
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Retries allowed after the initial attempt
    pub max_attempts: u32,
    /// Base delay in milliseconds (exponentially increased)
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,
    /// Jitter percentage (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&ResilienceConfig::default())
    }
}

impl From<&ResilienceConfig> for BackoffPolicy {
    fn from(config: &ResilienceConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: config.backoff_ms,
            max_delay_ms: config.max_backoff_ms,
            jitter: config.jitter,
        }
    }
}

impl BackoffPolicy {
    /// Whether the attempt numbered `retry_count` (0 = initial) may be followed by another.
    pub fn should_retry(&self, retry_count: u32) -> bool {
        retry_count < self.max_attempts
    }

    /// Delay before the retry that follows attempt `retry_count`.
    ///
    /// `min(base * 2^retry_count, max)`, then jittered.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let exponential_ms = 2u64
            .checked_pow(retry_count)
            .and_then(|factor| self.base_delay_ms.checked_mul(factor))
            .unwrap_or(u64::MAX);
        let capped_ms = exponential_ms.min(self.max_delay_ms);

        let jitter_range = (capped_ms as f64 * self.jitter.clamp(0.0, 1.0)) as i64;
        if jitter_range == 0 {
            return Duration::from_millis(capped_ms);
        }

        let mut rng = rand::rng();
        let jitter_ms = rng.random_range(-jitter_range..=jitter_range);
        let final_ms = (capped_ms as i64 + jitter_ms).max(0) as u64;
        Duration::from_millis(final_ms)
    }
}
