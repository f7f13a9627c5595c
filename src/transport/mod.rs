// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Streaming transport for chatwire
//!
//! SSE connection establishment, retry with backoff, and connection status reporting.

pub mod connection;
pub mod mock;
pub mod retry;
pub mod sse;
pub mod status;

pub use connection::{Connection, SseConnectionManager};
pub use retry::BackoffPolicy;
pub use sse::{HttpSseTransport, SseEvent, SseEventStream, SseRequest, SseTransport, TransportError};
pub use status::{ConnectionStatus, Notification, NotificationLevel, StatusReporter};
