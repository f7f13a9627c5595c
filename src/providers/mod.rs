// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat providers and the registry used to resolve them

pub mod provider;
pub mod registry;

pub use provider::{ConfiguredProvider, Provider, DEFAULT_ICON_KEY};
pub use registry::{ProviderRegistry, RegistryEvent};
