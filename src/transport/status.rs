// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Connection phase reporting

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the streaming connection as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Reconnecting => "reconnecting",
        }
    }

    /// Transient notification shown for this status
    pub fn notification(&self) -> Notification {
        match self {
            ConnectionStatus::Connecting => Notification {
                level: NotificationLevel::Info,
                title: "Connecting...",
                detail: "Establishing connection to chat service",
            },
            ConnectionStatus::Connected => Notification {
                level: NotificationLevel::Success,
                title: "Connected",
                detail: "Successfully connected to chat service",
            },
            ConnectionStatus::Disconnected => Notification {
                level: NotificationLevel::Error,
                title: "Connection Lost",
                detail: "The chat service closed the connection",
            },
            ConnectionStatus::Reconnecting => Notification {
                level: NotificationLevel::Info,
                title: "Reconnecting...",
                detail: "Attempting to restore connection",
            },
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// Short user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: &'static str,
    pub detail: &'static str,
}

/// Forwards connection phase transitions to a caller-supplied callback.
///
/// Holds no state of its own; fan-out to several listeners is the caller's job.
pub struct StatusReporter<'a> {
    callback: Option<&'a (dyn Fn(ConnectionStatus) + Send + Sync)>,
}

impl<'a> StatusReporter<'a> {
    pub fn new(callback: &'a (dyn Fn(ConnectionStatus) + Send + Sync)) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// A reporter that only logs
    pub fn silent() -> Self {
        Self { callback: None }
    }

    pub fn report(&self, status: ConnectionStatus) {
        tracing::debug!(
            target: "chatwire.transport",
            status = status.as_str(),
            "connection status"
        );
        if let Some(callback) = self.callback {
            callback(status);
        }
    }
}
