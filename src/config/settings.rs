// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for chatwire
//!
//! Handles loading and saving settings from ~/.chatwire/settings.json

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

mod env;
mod io;
mod merge;
mod validation;

pub use env::ENV_PREFIX;

/// Provider identifier used when nothing else is configured.
pub const FALLBACK_PROVIDER_ID: &str = "gpt";

/// Main settings structure, stored in ~/.chatwire/settings.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Chat backend location
    #[serde(default)]
    pub api: ApiConfig,

    /// Timeouts, retry and rate limits
    #[serde(default)]
    pub network: NetworkConfig,

    /// Message validation limits
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Provider registry contents
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Sampling hints; the backend picks its own, so these are only logged
    #[serde(default)]
    pub model: ModelParamsConfig,
}

/// Which backend deployment to talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Chat backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    /// Deployment selector
    #[serde(default)]
    pub environment: Environment,

    /// Base URL used in development
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_url: Option<String>,

    /// Base URL used in production
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prod_url: Option<String>,
}

impl ApiConfig {
    /// Base URL for the active environment, if configured.
    pub fn base_url(&self) -> Option<&str> {
        match self.environment {
            Environment::Development => self.dev_url.as_deref(),
            Environment::Production => self.prod_url.as_deref(),
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    #[serde(default)]
    pub retry: ResilienceConfig,

    #[serde(default)]
    pub rate_limits: RateLimitsConfig,
}

/// Timeouts in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Whole non-streaming request
    #[serde(default = "default_api_request_ms")]
    pub api_request_ms: u64,

    /// Whole streamed turn, from request until `[DONE]`
    #[serde(default = "default_stream_ms")]
    pub stream_ms: u64,

    /// One connection attempt, from request until the stream opens
    #[serde(default = "default_connection_ms")]
    pub connection_ms: u64,

    /// TCP connect
    #[serde(default = "default_socket_ms")]
    pub socket_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            api_request_ms: default_api_request_ms(),
            stream_ms: default_stream_ms(),
            connection_ms: default_connection_ms(),
            socket_ms: default_socket_ms(),
        }
    }
}

impl TimeoutsConfig {
    pub fn api_request(&self) -> Duration {
        Duration::from_millis(self.api_request_ms)
    }

    pub fn stream(&self) -> Duration {
        Duration::from_millis(self.stream_ms)
    }

    pub fn connection(&self) -> Duration {
        Duration::from_millis(self.connection_ms)
    }

    pub fn socket(&self) -> Duration {
        Duration::from_millis(self.socket_ms)
    }
}

/// Retry and backoff configuration for connection establishment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Reconnection attempts after the initial one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay in milliseconds for exponential backoff
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Maximum delay in milliseconds (cap for backoff)
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Jitter percentage (0.0 to 1.0) for randomizing delays
    #[serde(default)]
    pub jitter: f64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            jitter: 0.0,
        }
    }
}

/// Client-side request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitsConfig {
    /// Streamed turns started per rolling minute
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Streams allowed in flight at once
    #[serde(default = "default_concurrent_streams")]
    pub concurrent_streams: u32,
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            concurrent_streams: default_concurrent_streams(),
        }
    }
}

/// Message validation limits (lengths in characters)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    #[serde(default = "default_min_length")]
    pub min_length: usize,

    /// Maximum number of messages sent as context
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            min_length: default_min_length(),
            max_history: default_max_history(),
        }
    }
}

/// One provider entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Identifier used in request URLs
    #[serde(default)]
    pub id: String,

    /// Name shown to users
    #[serde(default)]
    pub display_name: String,

    /// Icon lookup key for front ends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_key: Option<String>,
}

impl ProviderEntry {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        icon_key: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            icon_key: icon_key.map(str::to_string),
        }
    }
}

/// Provider registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Entries keyed by configuration name
    #[serde(default = "default_provider_entries")]
    pub entries: BTreeMap<String, ProviderEntry>,

    /// Identifier of the default provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            entries: default_provider_entries(),
            default_provider: None,
        }
    }
}

/// Advisory sampling parameters.
///
/// The wire body carries messages only; the temperature travels with each
/// turn's options and shows up in the turn's log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParamsConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ModelParamsConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
        }
    }
}

impl ModelParamsConfig {
    pub const TEMPERATURE_RANGE: (f32, f32) = (0.0, 1.0);

    /// Temperature clamped to the supported range
    pub fn effective_temperature(&self) -> f32 {
        let (min, max) = Self::TEMPERATURE_RANGE;
        self.temperature.clamp(min, max)
    }
}

// Default value functions
fn default_api_request_ms() -> u64 {
    30_000
}

fn default_stream_ms() -> u64 {
    60_000
}

fn default_connection_ms() -> u64 {
    10_000
}

fn default_socket_ms() -> u64 {
    5_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

fn default_requests_per_minute() -> u32 {
    60
}

fn default_concurrent_streams() -> u32 {
    3
}

fn default_max_length() -> usize {
    4_000
}

fn default_min_length() -> usize {
    1
}

fn default_max_history() -> usize {
    100
}

fn default_temperature() -> f32 {
    0.7
}

pub(crate) fn default_provider_entries() -> BTreeMap<String, ProviderEntry> {
    let mut entries = BTreeMap::new();
    entries.insert(
        FALLBACK_PROVIDER_ID.to_string(),
        ProviderEntry::new(FALLBACK_PROVIDER_ID, "GPT", Some("openai")),
    );
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_defaults() {
        let settings = Settings::default();
        let timeouts = &settings.network.timeouts;
        assert_eq!(timeouts.api_request_ms, 30_000);
        assert_eq!(timeouts.stream_ms, 60_000);
        assert_eq!(timeouts.connection_ms, 10_000);
        assert_eq!(timeouts.socket_ms, 5_000);

        let retry = &settings.network.retry;
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.backoff_ms, 1_000);
        assert_eq!(retry.max_backoff_ms, 5_000);
        assert_eq!(retry.jitter, 0.0);

        assert_eq!(settings.network.rate_limits.requests_per_minute, 60);
        assert_eq!(settings.network.rate_limits.concurrent_streams, 3);
    }

    #[test]
    fn test_validation_defaults() {
        let validation = ValidationConfig::default();
        assert_eq!(validation.max_length, 4_000);
        assert_eq!(validation.min_length, 1);
        assert_eq!(validation.max_history, 100);
    }

    #[test]
    fn test_fallback_provider_entry() {
        let providers = ProvidersConfig::default();
        let gpt = providers.entries.get("gpt").unwrap();
        assert_eq!(gpt.id, "gpt");
        assert_eq!(gpt.display_name, "GPT");
        assert_eq!(gpt.icon_key.as_deref(), Some("openai"));
        assert!(providers.default_provider.is_none());
    }

    #[test]
    fn test_base_url_follows_environment() {
        let mut api = ApiConfig {
            environment: Environment::Development,
            dev_url: Some("http://localhost:3000".to_string()),
            prod_url: Some("https://chat.example.com".to_string()),
        };
        assert_eq!(api.base_url(), Some("http://localhost:3000"));

        api.environment = Environment::Production;
        assert_eq!(api.base_url(), Some("https://chat.example.com"));

        api.prod_url = None;
        assert_eq!(api.base_url(), None);
    }

    #[test]
    fn test_model_params_clamped() {
        let params = ModelParamsConfig { temperature: 1.7 };
        assert_eq!(params.effective_temperature(), 1.0);

        let params = ModelParamsConfig { temperature: -0.5 };
        assert_eq!(params.effective_temperature(), 0.0);

        let params = ModelParamsConfig { temperature: 0.3 };
        assert!((params.effective_temperature() - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{ "network": { "retry": { "max_attempts": 5 } } }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.network.retry.max_attempts, 5);
        assert_eq!(settings.network.retry.backoff_ms, 1_000);
        assert_eq!(settings.network.timeouts.stream_ms, 60_000);
        assert!(settings.providers.entries.contains_key("gpt"));
    }

    #[test]
    fn test_timeout_durations() {
        let timeouts = TimeoutsConfig::default();
        assert_eq!(timeouts.stream(), Duration::from_secs(60));
        assert_eq!(timeouts.connection(), Duration::from_secs(10));
    }
}
