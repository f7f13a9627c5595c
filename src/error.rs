// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for chatwire
//!
//! Validation failures are synchronous and block a send. Transport and stream
//! failures are asynchronous and reach the caller through `ChatCallbacks::on_error`.

use thiserror::Error;

/// Main error type for chatwire operations
#[derive(Error, Debug)]
pub enum ChatwireError {
    /// Transport or stream errors
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    /// Message validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised while establishing or consuming a chat stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The transport did not open within the per-attempt connection timeout
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// Every connection attempt failed and the retry budget is exhausted
    #[error("Failed to establish connection")]
    ConnectionFailed,

    /// The turn did not reach `[DONE]` before the stream deadline
    #[error("Stream timed out before completion")]
    StreamTimeout,

    /// An event payload was not the expected JSON shape
    #[error("Failed to parse response from server")]
    ParseError,

    /// Setup failed for a reason not otherwise classified
    #[error("{0}")]
    RequestError(String),

    /// A failure that carried no usable error value
    #[error("{0}")]
    UnknownError(String),

    /// The backend answered a non-streaming request with a non-success status
    #[error("Server responded with status: {status}")]
    HttpError { status: u16, message: String },

    /// Too many streams already in flight
    #[error("Maximum number of concurrent streams reached")]
    ConcurrentLimit,

    /// Too many requests in the current minute
    #[error("Too many requests. Please try again later.")]
    RateLimited,

    /// The caller cancelled the turn
    #[error("Request cancelled")]
    Cancelled,
}

impl ChatError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::ConnectionTimeout => "CONNECTION_TIMEOUT",
            ChatError::ConnectionFailed => "CONNECTION_FAILED",
            ChatError::StreamTimeout => "STREAM_TIMEOUT",
            ChatError::ParseError => "PARSE_ERROR",
            ChatError::RequestError(_) => "REQUEST_ERROR",
            ChatError::UnknownError(_) => "UNKNOWN_ERROR",
            ChatError::HttpError { .. } => "HTTP_ERROR",
            ChatError::ConcurrentLimit => "CONCURRENT_LIMIT",
            ChatError::RateLimited => "RATE_LIMITED",
            ChatError::Cancelled => "CANCELLED",
        }
    }

    /// Short human-readable text suitable for a transient notification
    pub fn user_message(&self) -> &'static str {
        match self {
            ChatError::ConnectionTimeout | ChatError::StreamTimeout => "Connection timed out",
            ChatError::ConnectionFailed | ChatError::RequestError(_) => {
                "Failed to connect to chat service"
            }
            ChatError::ParseError => "Failed to process AI response",
            ChatError::HttpError { .. } => "Server error occurred",
            ChatError::ConcurrentLimit | ChatError::RateLimited => "Please wait and try again",
            ChatError::Cancelled => "Request cancelled",
            ChatError::UnknownError(_) => "An unexpected error occurred",
        }
    }

    /// Whether this error ends the turn.
    ///
    /// Parse errors are reported per occurrence and more tokens may follow.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChatError::ParseError)
    }
}

/// Message validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Content is empty after trimming
    #[error("Message content cannot be empty")]
    EmptyMessage,

    /// Content is shorter than the configured minimum
    #[error("Message must be at least {limit} characters")]
    MessageTooShort { limit: usize },

    /// Content exceeds the configured maximum
    #[error("Message exceeds maximum length of {limit} characters")]
    MessageTooLong { limit: usize },

    /// The conversation holds more messages than allowed
    #[error("Conversation exceeds maximum of {limit} messages")]
    TooManyMessages { limit: usize },
}

impl ValidationError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::EmptyMessage => "EMPTY_MESSAGE",
            ValidationError::MessageTooShort { .. } => "MESSAGE_TOO_SHORT",
            ValidationError::MessageTooLong { .. } => "MESSAGE_TOO_LONG",
            ValidationError::TooManyMessages { .. } => "TOO_MANY_MESSAGES",
        }
    }
}

/// Errors from the caller-side chat session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A turn is already streaming for this conversation
    #[error("A response is still streaming")]
    TurnInProgress,
}

/// Result type alias for chatwire operations
pub type Result<T> = std::result::Result<T, ChatwireError>;

impl ChatwireError {
    /// Normalize any setup failure into the `ChatError` delivered to callbacks.
    ///
    /// Chat errors pass through unchanged, everything else becomes a request error.
    pub fn into_chat_error(self) -> ChatError {
        match self {
            ChatwireError::Chat(err) => err,
            other => ChatError::RequestError(other.to_string()),
        }
    }
}
