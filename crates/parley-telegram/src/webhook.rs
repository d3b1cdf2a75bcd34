// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram webhook update parsing.
//!
//! Updates without a `message` (edits, callbacks, channel posts) and
//! messages without text are dropped.

use parley_core::{Channel, InboundMessage, ParleyError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: Option<i64>,
    #[serde(default)]
    pub message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TgMessage {
    #[serde(default)]
    pub message_id: Option<i64>,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

pub fn parse_webhook(body: &[u8]) -> Result<Option<InboundMessage>, ParleyError> {
    let update: Update = serde_json::from_slice(body)
        .map_err(|e| ParleyError::InvalidPayload(format!("telegram update: {e}")))?;
    Ok(extract_message(&update))
}

/// Extracts the text message of an update, keyed by chat id.
pub fn extract_message(update: &Update) -> Option<InboundMessage> {
    let message = update.message.as_ref()?;
    let text = message.text.as_deref()?;
    if text.trim().is_empty() {
        return None;
    }

    Some(InboundMessage {
        channel: Channel::Telegram,
        sender_id: message.chat.id.to_string(),
        sender_name: display_name(message),
        text: text.to_string(),
    })
}

/// "First Last" from the sender, falling back to the private chat's names.
fn display_name(message: &TgMessage) -> String {
    let (first, last) = match &message.from {
        Some(user) => (Some(user.first_name.as_str()), user.last_name.as_deref()),
        None => (
            message.chat.first_name.as_deref(),
            message.chat.last_name.as_deref(),
        ),
    };
    [first, last]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
