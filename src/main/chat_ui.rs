// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io::{self, Write};

use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    ExecutableCommand,
};

use chatwire::chat::{ChatEvent, ChatSession};
use chatwire::error::{ChatError, Result, ValidationError};
use chatwire::transport::{ConnectionStatus, Notification, NotificationLevel};

fn level_color(level: NotificationLevel) -> Color {
    match level {
        NotificationLevel::Info => Color::Cyan,
        NotificationLevel::Success => Color::Green,
        NotificationLevel::Error => Color::Red,
    }
}

/// Print a one-line notification to stderr
pub(super) fn print_notification(notification: &Notification) -> Result<()> {
    let mut stderr = io::stderr();
    stderr.execute(SetForegroundColor(level_color(notification.level)))?;
    eprint!("[{}]", notification.title);
    stderr.execute(ResetColor)?;
    eprintln!(" {}", notification.detail);
    Ok(())
}

pub(super) fn print_status(status: ConnectionStatus) -> Result<()> {
    print_notification(&status.notification())
}

/// Print a chat error; non-terminal errors are shown as warnings
pub(super) fn print_chat_error(error: &ChatError) -> Result<()> {
    let mut stderr = io::stderr();
    let color = if error.is_terminal() {
        Color::Red
    } else {
        Color::Yellow
    };
    stderr.execute(SetForegroundColor(color))?;
    eprint!("[{}]", error.user_message());
    stderr.execute(ResetColor)?;
    eprintln!(" {} ({})", error, error.code());
    Ok(())
}

pub(super) fn print_validation_error(error: &ValidationError) -> Result<()> {
    let mut stderr = io::stderr();
    stderr.execute(SetForegroundColor(Color::Yellow))?;
    eprint!("[Invalid message]");
    stderr.execute(ResetColor)?;
    eprintln!(" {}", error);
    Ok(())
}

enum Wake {
    Event(Option<ChatEvent>),
    Interrupted,
}

/// Print the current turn as it streams.
///
/// Ctrl-C cancels the turn and clears the session. Returns the terminal error, if any.
pub(super) async fn stream_turn(session: &mut ChatSession) -> Result<Option<ChatError>> {
    let mut stdout = io::stdout();
    let mut failure = None;
    let mut mid_line = false;

    while session.is_loading() {
        let wake = tokio::select! {
            event = session.next_event() => Wake::Event(event),
            _ = tokio::signal::ctrl_c() => Wake::Interrupted,
        };

        let event = match wake {
            Wake::Event(Some(event)) => event,
            Wake::Event(None) => break,
            Wake::Interrupted => {
                session.clear();
                if mid_line {
                    println!();
                }
                eprintln!("Cancelled. Conversation cleared.");
                return Ok(None);
            }
        };

        match event {
            ChatEvent::Token { delta, .. } => {
                print!("{}", delta);
                stdout.flush()?;
                mid_line = true;
            }
            ChatEvent::Status { status, .. } => {
                if mid_line {
                    println!();
                    mid_line = false;
                }
                print_status(status)?;
            }
            ChatEvent::Error { error, .. } => {
                if mid_line {
                    println!();
                    mid_line = false;
                }
                print_chat_error(&error)?;
                if error.is_terminal() {
                    failure = Some(error);
                }
            }
            ChatEvent::Complete { .. } | ChatEvent::Finished { .. } => {}
        }
    }

    if mid_line {
        println!();
    }
    Ok(failure)
}

/// Read one line from stdin after a prompt
pub(super) fn read_user_input(provider: &str) -> Result<Option<String>> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Green))?;
    print!("you ({}): ", provider);
    stdout.execute(ResetColor)?;
    stdout.flush()?;

    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}
