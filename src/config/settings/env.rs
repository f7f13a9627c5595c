// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::collections::BTreeMap;
use std::str::FromStr;

use super::{Environment, ProviderEntry, Settings};

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "CHATWIRE_";

impl Settings {
    /// Apply overrides from the process environment.
    ///
    /// Priority: env var > config file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides using an arbitrary variable lookup.
    pub fn apply_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(env) = var("ENV") {
            match env.to_ascii_lowercase().as_str() {
                "production" | "prod" => self.api.environment = Environment::Production,
                "development" | "dev" => self.api.environment = Environment::Development,
                other => tracing::warn!(
                    target: "chatwire.config",
                    value = other,
                    "ignoring unknown {ENV_PREFIX}ENV value"
                ),
            }
        }
        if let Some(url) = var("DEV_API_URL") {
            self.api.dev_url = Some(url);
        }
        if let Some(url) = var("PROD_API_URL") {
            self.api.prod_url = Some(url);
        }

        let timeouts = &mut self.network.timeouts;
        override_number(&var, "API_REQUEST_TIMEOUT", &mut timeouts.api_request_ms);
        override_number(&var, "STREAM_TIMEOUT", &mut timeouts.stream_ms);
        override_number(&var, "CONNECTION_TIMEOUT", &mut timeouts.connection_ms);
        override_number(&var, "SOCKET_TIMEOUT", &mut timeouts.socket_ms);

        let retry = &mut self.network.retry;
        override_number(&var, "MAX_RETRY_ATTEMPTS", &mut retry.max_attempts);
        override_number(&var, "RETRY_BACKOFF_MS", &mut retry.backoff_ms);
        override_number(&var, "MAX_RETRY_BACKOFF_MS", &mut retry.max_backoff_ms);

        let limits = &mut self.network.rate_limits;
        override_number(&var, "REQUESTS_PER_MINUTE", &mut limits.requests_per_minute);
        override_number(&var, "CONCURRENT_STREAMS", &mut limits.concurrent_streams);

        let validation = &mut self.validation;
        override_number(&var, "MAX_MESSAGE_LENGTH", &mut validation.max_length);
        override_number(&var, "MIN_MESSAGE_LENGTH", &mut validation.min_length);
        override_number(&var, "MAX_MESSAGES_IN_CONTEXT", &mut validation.max_history);

        override_number(&var, "TEMPERATURE", &mut self.model.temperature);

        if let Some(raw) = var("PROVIDERS") {
            match parse_provider_entries(&raw) {
                Ok(entries) => self.providers.entries = entries,
                Err(reason) => tracing::warn!(
                    target: "chatwire.config",
                    reason = %reason,
                    "failed to parse {ENV_PREFIX}PROVIDERS, keeping configured providers"
                ),
            }
        }
        if let Some(default_provider) = var("DEFAULT_PROVIDER") {
            self.providers.default_provider = Some(default_provider);
        }
    }
}

fn override_number<T, F>(var: &F, name: &str, slot: &mut T)
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = var(name) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(
            target: "chatwire.config",
            variable = %format!("{ENV_PREFIX}{name}"),
            value = %raw,
            "ignoring unparseable numeric override"
        ),
    }
}

/// Parse a provider map from JSON, requiring `id` and `display_name` on every entry.
fn parse_provider_entries(raw: &str) -> Result<BTreeMap<String, ProviderEntry>, String> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let object = value
        .as_object()
        .ok_or_else(|| "providers must be a JSON object".to_string())?;

    let mut entries = BTreeMap::new();
    for (key, config) in object {
        let entry: ProviderEntry =
            serde_json::from_value(config.clone()).map_err(|e| format!("'{key}': {e}"))?;
        if entry.id.is_empty() || entry.display_name.is_empty() {
            return Err(format!(
                "provider config for '{key}' is missing required fields: id or display_name"
            ));
        }
        entries.insert(key.clone(), entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_numeric_overrides() {
        let mut settings = Settings::default();
        settings.apply_overrides_with(lookup(&[
            ("CHATWIRE_STREAM_TIMEOUT", "90000"),
            ("CHATWIRE_MAX_RETRY_ATTEMPTS", "5"),
            ("CHATWIRE_MAX_MESSAGE_LENGTH", "1200"),
            ("CHATWIRE_CONCURRENT_STREAMS", "1"),
            ("CHATWIRE_TEMPERATURE", "0.25"),
        ]));
        assert_eq!(settings.network.timeouts.stream_ms, 90_000);
        assert_eq!(settings.network.retry.max_attempts, 5);
        assert_eq!(settings.validation.max_length, 1200);
        assert_eq!(settings.network.rate_limits.concurrent_streams, 1);
        assert!((settings.model.temperature - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unparseable_numbers_are_ignored() {
        let mut settings = Settings::default();
        settings.apply_overrides_with(lookup(&[("CHATWIRE_CONNECTION_TIMEOUT", "soon")]));
        assert_eq!(settings.network.timeouts.connection_ms, 10_000);
    }

    #[test]
    fn test_environment_and_urls() {
        let mut settings = Settings::default();
        settings.apply_overrides_with(lookup(&[
            ("CHATWIRE_ENV", "PRODUCTION"),
            ("CHATWIRE_PROD_API_URL", "https://chat.example.com"),
        ]));
        assert_eq!(settings.api.environment, Environment::Production);
        assert_eq!(settings.api.base_url(), Some("https://chat.example.com"));
    }

    #[test]
    fn test_providers_json_override() {
        let mut settings = Settings::default();
        settings.apply_overrides_with(lookup(&[
            (
                "CHATWIRE_PROVIDERS",
                r#"{"claude": {"id": "claude", "display_name": "Claude", "icon_key": "anthropic"},
                    "gemini": {"id": "gemini", "display_name": "Gemini"}}"#,
            ),
            ("CHATWIRE_DEFAULT_PROVIDER", "gemini"),
        ]));
        assert_eq!(settings.providers.entries.len(), 2);
        assert_eq!(
            settings.providers.entries["claude"].icon_key.as_deref(),
            Some("anthropic")
        );
        assert_eq!(settings.providers.default_provider.as_deref(), Some("gemini"));
    }

    #[test]
    fn test_invalid_providers_json_keeps_existing() {
        let mut settings = Settings::default();
        settings.apply_overrides_with(lookup(&[("CHATWIRE_PROVIDERS", "[1, 2]")]));
        assert!(settings.providers.entries.contains_key("gpt"));

        settings.apply_overrides_with(lookup(&[(
            "CHATWIRE_PROVIDERS",
            r#"{"claude": {"id": "claude"}}"#,
        )]));
        assert!(settings.providers.entries.contains_key("gpt"));
        assert!(!settings.providers.entries.contains_key("claude"));
    }
}
