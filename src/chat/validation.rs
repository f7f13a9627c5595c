// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Message validation
//!
//! User input is truncated first and validated second, so input that is
//! empty after trimming is rejected instead of reaching the server.

use crate::chat::message::Message;
use crate::config::settings::ValidationConfig;
use crate::error::ValidationError;

/// Unicode whitespace plus the byte order mark
fn is_blank(c: char) -> bool {
    c.is_whitespace() || c == '\u{FEFF}'
}

fn trim_blank(text: &str) -> &str {
    text.trim_matches(is_blank)
}

/// Trim `text` and keep at most `max_chars` characters.
///
/// Blank input yields an empty string. Blanks exposed by the cut are trimmed
/// too, so applying this twice gives the same result.
pub fn first_n_chars_or_less(text: &str, max_chars: usize) -> String {
    let trimmed = trim_blank(text);
    match trimmed.char_indices().nth(max_chars) {
        Some((byte_index, _)) => trimmed[..byte_index].trim_end_matches(is_blank).to_string(),
        None => trimmed.to_string(),
    }
}

/// Enforces message shape, length and history size limits
#[derive(Debug, Clone, Default)]
pub struct MessageValidator {
    config: ValidationConfig,
}

impl MessageValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a single message.
    pub fn validate(&self, message: &Message) -> Result<(), ValidationError> {
        let content = trim_blank(&message.content);
        if content.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }

        let length = content.chars().count();
        if length < self.config.min_length {
            return Err(ValidationError::MessageTooShort {
                limit: self.config.min_length,
            });
        }
        if length > self.config.max_length {
            return Err(ValidationError::MessageTooLong {
                limit: self.config.max_length,
            });
        }
        Ok(())
    }

    /// Pre-flight size check for a history about to be sent.
    ///
    /// Returned as a value rather than an error so callers can decide whether
    /// it blocks the send.
    pub fn validate_history(&self, messages: &[Message]) -> Option<ValidationError> {
        if messages.len() > self.config.max_history {
            return Some(ValidationError::TooManyMessages {
                limit: self.config.max_history,
            });
        }
        None
    }

    /// History size first, then each message in order. Returns the first problem.
    pub fn validate_messages(&self, messages: &[Message]) -> Option<ValidationError> {
        tracing::debug!(
            target: "chatwire.chat",
            count = messages.len(),
            action = "validate_messages",
            "validating messages"
        );

        self.validate_history(messages).or_else(|| {
            messages
                .iter()
                .find_map(|message| self.validate(message).err())
        })
    }

    /// Truncate raw input, build a timestamped user message and validate it.
    pub fn prepare_user_message(&self, input: &str) -> Result<Message, ValidationError> {
        let content = first_n_chars_or_less(input, self.config.max_length);
        let message = Message::user(content);

        tracing::debug!(
            target: "chatwire.chat",
            content_length = message.content.chars().count(),
            preview = %preview(&message.content),
            action = "user_message",
            "prepared user message"
        );

        if let Err(err) = self.validate(&message) {
            tracing::debug!(
                target: "chatwire.chat",
                code = err.code(),
                "user message rejected"
            );
            return Err(err);
        }
        Ok(message)
    }
}

/// First 30 characters of user content, for logs
fn preview(content: &str) -> String {
    if content.chars().count() > 30 {
        format!("{}...", first_n_chars_or_less(content, 30))
    } else {
        content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(max_length: usize, max_history: usize) -> MessageValidator {
        MessageValidator::new(ValidationConfig {
            max_length,
            min_length: 1,
            max_history,
        })
    }

    #[test]
    fn test_byte_order_mark_counts_as_blank() {
        let validator = validator(10, 100);
        assert_eq!(
            validator.prepare_user_message(" \u{FEFF} ").unwrap_err(),
            ValidationError::EmptyMessage
        );
        assert_eq!(
            validator.validate(&Message::user("\u{FEFF}")).unwrap_err(),
            ValidationError::EmptyMessage
        );

        let message = validator.prepare_user_message("\u{FEFF}hi\u{FEFF}").unwrap();
        assert_eq!(message.content, "hi");
        assert_eq!(first_n_chars_or_less("ab\u{FEFF}cd", 3), "ab");
    }

    #[test]
    fn test_truncation_trims_and_cuts() {
        assert_eq!(first_n_chars_or_less("  hello world  ", 5), "hello");
        assert_eq!(first_n_chars_or_less("hi", 5), "hi");
        assert_eq!(first_n_chars_or_less("   ", 5), "");
        assert_eq!(first_n_chars_or_less("", 5), "");
        assert_eq!(first_n_chars_or_less("ab cd", 3), "ab");
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        assert_eq!(first_n_chars_or_less("héllo wörld", 7), "héllo w");
        assert_eq!(first_n_chars_or_less("日本語テキスト", 3), "日本語");
    }

    #[test]
    fn test_length_boundary() {
        let validator = validator(10, 100);
        assert!(validator.validate(&Message::user("a".repeat(10))).is_ok());
        assert_eq!(
            validator.validate(&Message::user("a".repeat(11))),
            Err(ValidationError::MessageTooLong { limit: 10 })
        );
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        let validator = MessageValidator::default();
        assert_eq!(
            validator.validate(&Message::user("   ")),
            Err(ValidationError::EmptyMessage)
        );
        assert_eq!(
            validator.prepare_user_message(" \n\t "),
            Err(ValidationError::EmptyMessage)
        );
    }

    #[test]
    fn test_min_length() {
        let validator = MessageValidator::new(ValidationConfig {
            max_length: 100,
            min_length: 3,
            max_history: 10,
        });
        assert_eq!(
            validator.validate(&Message::user("hi")),
            Err(ValidationError::MessageTooShort { limit: 3 })
        );
        assert!(validator.validate(&Message::user("hey")).is_ok());
    }

    #[test]
    fn test_prepare_truncates_before_validating() {
        let validator = validator(5, 100);
        let message = validator.prepare_user_message("   abcdefgh   ").unwrap();
        assert_eq!(message.content, "abcde");
        assert!(message.timestamp.is_some());
    }

    #[test]
    fn test_history_too_long() {
        let validator = validator(100, 2);
        let messages = vec![
            Message::user("a"),
            Message::assistant("b"),
            Message::user("c"),
        ];
        assert_eq!(
            validator.validate_history(&messages),
            Some(ValidationError::TooManyMessages { limit: 2 })
        );
        assert_eq!(validator.validate_history(&messages[..2]), None);
        assert_eq!(
            validator.validate_messages(&messages),
            Some(ValidationError::TooManyMessages { limit: 2 })
        );
    }

    #[test]
    fn test_history_reports_first_invalid_message() {
        let validator = validator(100, 10);
        let messages = vec![Message::user("fine"), Message::assistant("  ")];
        assert_eq!(validator.validate_history(&messages), None);
        assert_eq!(
            validator.validate_messages(&messages),
            Some(ValidationError::EmptyMessage)
        );
    }

    proptest::proptest! {
        #[test]
        fn prop_truncation_is_idempotent(text in "\\PC{0,64}", n in 0usize..80) {
            let once = first_n_chars_or_less(&text, n);
            proptest::prop_assert_eq!(first_n_chars_or_less(&once, n), once.clone());
            proptest::prop_assert!(once.chars().count() <= n);
        }

        #[test]
        fn prop_validation_is_deterministic(text in "\\PC{0,32}") {
            let validator = validator(16, 10);
            let message = Message::user(text);
            proptest::prop_assert_eq!(validator.validate(&message), validator.validate(&message));
        }
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(40);
        assert_eq!(preview(&long), format!("{}...", "x".repeat(30)));
    }
}
