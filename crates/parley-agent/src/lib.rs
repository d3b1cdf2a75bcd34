// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation handling for the Parley service.
//!
//! - [`ContactResolver`] maps platform identities to contacts
//! - [`ConversationLog`] stores inbound and outbound legs and their workflow
//! - [`ConversationPipeline`] runs one message from contact to reply
//! - [`WebhookDispatcher`] parses platform webhooks and applies each
//!   platform's failure policy
//! - [`Broadcaster`] fans a template out to contacts

pub mod broadcast;
pub mod contacts;
pub mod conversation;
pub mod dispatch;
pub mod pipeline;
pub mod senders;
pub mod shutdown;

pub use broadcast::{BroadcastSummary, Broadcaster};
pub use contacts::ContactResolver;
pub use conversation::ConversationLog;
pub use dispatch::{DispatchOutcome, WebhookDispatcher};
pub use pipeline::{ConversationPipeline, Turn};
pub use senders::SenderSet;
