// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram Bot API support for Parley: webhook update parsing and a
//! `sendMessage` sender.

pub mod sender;
pub mod webhook;

pub use sender::{parse_chat_id, TelegramSender};
pub use webhook::parse_webhook;
