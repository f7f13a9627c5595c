// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use chatwire::chat::{first_n_chars_or_less, Message, MessageValidator};
use chatwire::config::ValidationConfig;
use chatwire::error::{ChatError, ValidationError};
use proptest::prelude::*;

fn validator() -> MessageValidator {
    MessageValidator::new(ValidationConfig::default())
}

#[test]
fn test_max_length_boundary_uses_configured_limit() {
    let validator = validator();

    assert!(validator.validate(&Message::user("a".repeat(4000))).is_ok());

    let err = validator
        .validate(&Message::user("a".repeat(4001)))
        .unwrap_err();
    assert_eq!(err, ValidationError::MessageTooLong { limit: 4000 });
    assert_eq!(
        err.to_string(),
        "Message exceeds maximum length of 4000 characters"
    );
}

#[test]
fn test_whitespace_input_is_empty_message() {
    let err = validator().prepare_user_message("   ").unwrap_err();
    assert_eq!(err, ValidationError::EmptyMessage);
    assert_eq!(err.to_string(), "Message content cannot be empty");
    assert_eq!(err.code(), "EMPTY_MESSAGE");
}

#[test]
fn test_long_input_is_truncated_not_rejected() {
    let input = format!("  {}  ", "b".repeat(5000));
    let message = validator().prepare_user_message(&input).unwrap();
    assert_eq!(message.content.chars().count(), 4000);
}

#[test]
fn test_history_limit_message() {
    let history: Vec<Message> = (0..101).map(|i| Message::user(format!("m{}", i))).collect();
    let err = validator().validate_messages(&history).unwrap();
    assert_eq!(err.to_string(), "Conversation exceeds maximum of 100 messages");
}

#[test]
fn test_chat_error_user_messages() {
    assert_eq!(
        ChatError::ConnectionFailed.user_message(),
        "Failed to connect to chat service"
    );
    assert_eq!(ChatError::StreamTimeout.code(), "STREAM_TIMEOUT");
    assert!(!ChatError::ParseError.is_terminal());
    assert!(ChatError::ConnectionTimeout.is_terminal());
}

proptest! {
    #[test]
    fn prop_prepared_messages_always_validate(input in "\\PC{0,200}") {
        let validator = MessageValidator::new(ValidationConfig {
            max_length: 50,
            min_length: 1,
            max_history: 10,
        });
        match validator.prepare_user_message(&input) {
            Ok(message) => {
                prop_assert!(validator.validate(&message).is_ok());
                prop_assert!(message.content.chars().count() <= 50);
            }
            Err(err) => {
                prop_assert_eq!(err, ValidationError::EmptyMessage);
                prop_assert!(input.trim().is_empty());
            }
        }
    }

    #[test]
    fn prop_truncation_idempotent(input in "\\PC{0,120}", n in 0usize..100) {
        let once = first_n_chars_or_less(&input, n);
        prop_assert_eq!(first_n_chars_or_less(&once, n), once);
    }
}
