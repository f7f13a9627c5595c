// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Provider trait and the configuration-backed implementation

use crate::chat::message::Message;
use crate::config::settings::ProviderEntry;

/// Icon key used when an entry does not name one
pub const DEFAULT_ICON_KEY: &str = "default";

/// A logical chat backend addressed by a string identifier
pub trait Provider: Send + Sync {
    /// Identifier used in request URLs (e.g., "gpt", "claude")
    fn id(&self) -> &str;

    /// Name shown to users
    fn display_name(&self) -> &str;

    /// Icon lookup key for front ends
    fn icon_key(&self) -> &str {
        DEFAULT_ICON_KEY
    }

    /// Provider-specific shaping of the outbound message list.
    ///
    /// The default sends the messages unchanged.
    fn prepare_messages(&self, messages: &[Message]) -> Vec<Message> {
        messages.to_vec()
    }
}

/// A provider described entirely by configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredProvider {
    id: String,
    display_name: String,
    icon_key: String,
}

impl ConfiguredProvider {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        icon_key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            icon_key: icon_key.into(),
        }
    }

    /// Build from a settings entry. Entries without an id or display name are skipped.
    pub fn from_entry(key: &str, entry: &ProviderEntry) -> Option<Self> {
        if entry.id.trim().is_empty() || entry.display_name.trim().is_empty() {
            tracing::warn!(
                target: "chatwire.providers",
                key,
                "skipping provider entry without id or display name"
            );
            return None;
        }

        let icon_key = entry
            .icon_key
            .as_deref()
            .filter(|icon| !icon.is_empty())
            .unwrap_or(DEFAULT_ICON_KEY);

        Some(Self::new(entry.id.trim(), entry.display_name.trim(), icon_key))
    }
}

impl Provider for ConfiguredProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn icon_key(&self) -> &str {
        &self.icon_key
    }
}
