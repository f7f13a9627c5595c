// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use super::Settings;

impl Settings {
    /// Check the settings for values the chat core cannot work with.
    ///
    /// Returns one human-readable line per problem; an empty list means usable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let timeouts = &self.network.timeouts;

        for (name, value) in [
            ("api_request_ms", timeouts.api_request_ms),
            ("stream_ms", timeouts.stream_ms),
            ("connection_ms", timeouts.connection_ms),
            ("socket_ms", timeouts.socket_ms),
        ] {
            if value == 0 {
                problems.push(format!("network.timeouts.{name} must be greater than zero"));
            }
        }

        // Retries happen inside the stream window.
        if timeouts.stream_ms <= timeouts.connection_ms {
            problems.push(format!(
                "network.timeouts.stream_ms ({}) must exceed connection_ms ({})",
                timeouts.stream_ms, timeouts.connection_ms
            ));
        }

        let retry = &self.network.retry;
        if retry.backoff_ms > retry.max_backoff_ms {
            problems.push(format!(
                "network.retry.backoff_ms ({}) exceeds max_backoff_ms ({})",
                retry.backoff_ms, retry.max_backoff_ms
            ));
        }
        if !(0.0..=1.0).contains(&retry.jitter) {
            problems.push("network.retry.jitter must be between 0.0 and 1.0".to_string());
        }

        let limits = &self.network.rate_limits;
        if limits.concurrent_streams == 0 {
            problems.push("network.rate_limits.concurrent_streams must be at least 1".to_string());
        }
        if limits.requests_per_minute == 0 {
            problems.push("network.rate_limits.requests_per_minute must be at least 1".to_string());
        }

        let validation = &self.validation;
        if validation.min_length > validation.max_length {
            problems.push(format!(
                "validation.min_length ({}) exceeds max_length ({})",
                validation.min_length, validation.max_length
            ));
        }
        if validation.max_history == 0 {
            problems.push("validation.max_history must be at least 1".to_string());
        }

        if let Some(default_id) = &self.providers.default_provider {
            let known = self
                .providers
                .entries
                .values()
                .any(|entry| &entry.id == default_id);
            if !known {
                problems.push(format!(
                    "providers.default_provider '{default_id}' is not a configured provider"
                ));
            }
        }

        problems
    }
}
