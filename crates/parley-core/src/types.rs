// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the conversation pipeline.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a persisted conversation message row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Sender,
    Provider,
    Storage,
    Embedding,
    Observability,
}

/// Messaging platform a contact is reached through.
///
/// The string forms (`WhatsApp`, `Instagram`, `Telegram`) are what gets stored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum Channel {
    WhatsApp,
    Instagram,
    Telegram,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::WhatsApp, Channel::Instagram, Channel::Telegram];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::WhatsApp => "WhatsApp",
            Channel::Instagram => "Instagram",
            Channel::Telegram => "Telegram",
        }
    }

    /// Lowercase slug used in URLs and metric labels.
    pub fn slug(&self) -> &'static str {
        match self {
            Channel::WhatsApp => "whatsapp",
            Channel::Instagram => "instagram",
            Channel::Telegram => "telegram",
        }
    }

    /// Parse either the stored form or the slug.
    pub fn from_slug(s: &str) -> Option<Channel> {
        Channel::ALL
            .into_iter()
            .find(|c| c.slug() == s || c.as_str() == s)
    }
}

/// Workflow status of one conversation leg.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum MessageStatus {
    Unassigned,
    Assigned,
    Resolved,
    Answered,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Unassigned => "Unassigned",
            MessageStatus::Assigned => "Assigned",
            MessageStatus::Resolved => "Resolved",
            MessageStatus::Answered => "Answered",
        }
    }

    /// Unknown strings fall back to `Unassigned`.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "Assigned" => MessageStatus::Assigned,
            "Resolved" => MessageStatus::Resolved,
            "Answered" => MessageStatus::Answered,
            _ => MessageStatus::Unassigned,
        }
    }
}

/// Engagement tier attached to a contact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum Temperature {
    Cold,
    Warm,
    Hot,
}

/// A text message extracted from a platform webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub channel: Channel,
    /// Platform-specific sender id (phone number, page-scoped id, chat id).
    pub sender_id: String,
    /// Display name reported by the platform; may be empty.
    pub sender_name: String,
    pub text: String,
}

/// Input to the generative responder.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub user_message: String,
    pub contact_name: String,
    pub contact_id: i64,
    /// Retrieved context block; empty means no context.
    pub context: String,
}

/// A generated reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResponse {
    pub text: String,
    pub tokens_used: u32,
}

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding adapter, one vector per input text.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

/// Credentials a platform sender needs to deliver a message.
#[derive(Clone, PartialEq, Eq)]
pub struct PlatformCredentials {
    pub channel: Channel,
    /// Bearer/access token or bot token.
    pub token: String,
    /// WhatsApp phone number id or Instagram page id; unused by Telegram.
    pub account_id: Option<String>,
    pub active: bool,
}

impl std::fmt::Debug for PlatformCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformCredentials")
            .field("channel", &self.channel)
            .field("token", &"[redacted]")
            .field("account_id", &self.account_id)
            .field("active", &self.active)
            .finish()
    }
}

/// Result of a send attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The platform accepted the message.
    Delivered,
    /// Nothing was sent because the platform is not configured or inactive.
    Skipped(String),
}
