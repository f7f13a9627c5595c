// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Provider registry
//!
//! Built once at startup and shared by reference. Changes are published on a
//! broadcast channel so front ends can refresh their provider pickers.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

use crate::config::settings::{ProvidersConfig, FALLBACK_PROVIDER_ID};

use super::provider::{ConfiguredProvider, Provider};

const EVENT_CAPACITY: usize = 32;

/// Change notification published by the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Registered(String),
    Unregistered(String),
    DefaultChanged(Option<String>),
}

#[derive(Default)]
struct RegistryInner {
    /// Providers in registration order
    providers: Vec<Arc<dyn Provider>>,
    default_id: Option<String>,
}

impl RegistryInner {
    fn position(&self, id: &str) -> Option<usize> {
        self.providers.iter().position(|p| p.id() == id)
    }
}

/// Known providers plus the default one
pub struct ProviderRegistry {
    inner: RwLock<RegistryInner>,
    events: broadcast::Sender<RegistryEvent>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: RwLock::new(RegistryInner::default()),
            events,
        }
    }

    /// Build a registry from configured entries and the configured default.
    pub fn from_config(config: &ProvidersConfig) -> Self {
        let registry = Self::new();
        for (key, entry) in &config.entries {
            if let Some(provider) = ConfiguredProvider::from_entry(key, entry) {
                registry.register(Arc::new(provider));
            }
        }
        if let Some(default_id) = &config.default_provider {
            registry.set_default(default_id);
        }
        registry
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, event: RegistryEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Add or replace a provider. The first provider registered becomes the default.
    pub fn register(&self, provider: Arc<dyn Provider>) {
        let id = provider.id().to_string();
        let became_default = {
            let mut inner = self.write();
            match inner.position(&id) {
                Some(index) => inner.providers[index] = provider,
                None => inner.providers.push(provider),
            }
            if inner.default_id.is_none() {
                inner.default_id = Some(id.clone());
                true
            } else {
                false
            }
        };

        tracing::info!(target: "chatwire.providers", provider = %id, "provider registered");
        self.publish(RegistryEvent::Registered(id.clone()));
        if became_default {
            self.publish(RegistryEvent::DefaultChanged(Some(id)));
        }
    }

    /// Remove a provider. Returns false if it was not registered.
    ///
    /// Removing the default promotes the earliest remaining provider.
    pub fn unregister(&self, id: &str) -> bool {
        let default_change = {
            let mut inner = self.write();
            let Some(index) = inner.position(id) else {
                return false;
            };
            inner.providers.remove(index);
            if inner.default_id.as_deref() == Some(id) {
                inner.default_id = inner.providers.first().map(|p| p.id().to_string());
                Some(inner.default_id.clone())
            } else {
                None
            }
        };

        tracing::info!(target: "chatwire.providers", provider = %id, "provider unregistered");
        self.publish(RegistryEvent::Unregistered(id.to_string()));
        if let Some(new_default) = default_change {
            self.publish(RegistryEvent::DefaultChanged(new_default));
        }
        true
    }

    /// Make `id` the default. Unknown ids are ignored with a warning.
    pub fn set_default(&self, id: &str) -> bool {
        {
            let mut inner = self.write();
            if inner.position(id).is_none() {
                drop(inner);
                tracing::warn!(
                    target: "chatwire.providers",
                    provider = %id,
                    "cannot set unknown provider as default"
                );
                return false;
            }
            if inner.default_id.as_deref() == Some(id) {
                return true;
            }
            inner.default_id = Some(id.to_string());
        }

        tracing::info!(target: "chatwire.providers", provider = %id, "default provider changed");
        self.publish(RegistryEvent::DefaultChanged(Some(id.to_string())));
        true
    }

    pub fn default_provider(&self) -> Option<String> {
        self.read().default_id.clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        let inner = self.read();
        inner.position(id).map(|index| inner.providers[index].clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().position(id).is_some()
    }

    /// Registered ids in registration order
    pub fn ids(&self) -> Vec<String> {
        self.read()
            .providers
            .iter()
            .map(|p| p.id().to_string())
            .collect()
    }

    pub fn all(&self) -> Vec<Arc<dyn Provider>> {
        self.read().providers.clone()
    }

    pub fn len(&self) -> usize {
        self.read().providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().providers.is_empty()
    }

    /// Receive every change made after this call
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Pick the provider for a request.
    ///
    /// A known `requested` id wins; otherwise the default, otherwise the
    /// hard-coded fallback. Never fails.
    pub fn resolve(&self, requested: Option<&str>) -> String {
        let inner = self.read();

        if let Some(id) = requested {
            if inner.position(id).is_some() {
                return id.to_string();
            }
            tracing::warn!(
                target: "chatwire.providers",
                requested = %id,
                "unknown provider requested, using default"
            );
        }

        match &inner.default_id {
            Some(default_id) => default_id.clone(),
            None => {
                tracing::warn!(
                    target: "chatwire.providers",
                    fallback = FALLBACK_PROVIDER_ID,
                    "no default provider configured, using fallback"
                );
                FALLBACK_PROVIDER_ID.to_string()
            }
        }
    }
}
