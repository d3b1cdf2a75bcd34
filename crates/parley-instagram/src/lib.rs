// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instagram messaging support for Parley.
//!
//! One webhook delivery may batch several entries, each with several
//! messaging events; [`parse_webhook`] returns all actionable ones.

pub mod sender;
pub mod webhook;

pub use sender::InstagramSender;
pub use webhook::parse_webhook;
