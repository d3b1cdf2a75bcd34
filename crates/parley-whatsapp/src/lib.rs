// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API support for Parley.
//!
//! [`webhook`] turns an inbound webhook body into an [`InboundMessage`];
//! [`sender`] delivers plain-text replies through the Graph API.
//!
//! [`InboundMessage`]: parley_core::InboundMessage

pub mod sender;
pub mod webhook;

pub use sender::WhatsAppSender;
pub use webhook::parse_webhook;
