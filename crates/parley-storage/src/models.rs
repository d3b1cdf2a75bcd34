// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for storage entities.

use parley_core::types::{Channel, MessageStatus};
use serde::Serialize;

/// A contact reached through one messaging channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub id: i64,
    /// Human-readable code such as `C000001`.
    pub code: String,
    pub channel: Channel,
    /// Platform-side identifier (phone number, IGSID, chat id).
    pub channel_id: String,
    pub name: String,
    pub contact_status: String,
    pub temperature: String,
    pub first_contact_at: String,
    pub last_contact_at: String,
    pub last_agent: String,
    pub last_agent_type: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields needed to create a contact.
#[derive(Debug, Clone)]
pub struct NewContact {
    pub channel: Channel,
    pub channel_id: String,
    pub name: String,
    pub temperature: String,
}

/// How contact codes are rendered.
#[derive(Debug, Clone)]
pub struct CodeFormat {
    pub prefix: String,
    pub width: usize,
}

impl CodeFormat {
    pub fn render(&self, sequence: i64) -> String {
        format!("{}{:0width$}", self.prefix, sequence, width = self.width)
    }
}

impl Default for CodeFormat {
    fn default() -> Self {
        Self {
            prefix: "C".to_string(),
            width: 6,
        }
    }
}

/// One leg (inbound or outbound) of a conversational turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationMessage {
    pub id: i64,
    pub contact_id: i64,
    pub contact_name: String,
    pub message: String,
    pub response: Option<String>,
    pub channel: Channel,
    pub status: MessageStatus,
    pub assigned_to: Option<String>,
    pub assigned_agent: Option<String>,
    /// Comma-separated label ids.
    pub labels: String,
    pub tokens_used: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields needed to append a conversation leg.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub contact_id: i64,
    pub contact_name: String,
    pub message: String,
    pub response: Option<String>,
    pub channel: Channel,
    pub status: MessageStatus,
    pub assigned_to: Option<String>,
    pub assigned_agent: Option<String>,
    pub tokens_used: i64,
}

/// Aggregate counters over the conversation log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChatStats {
    pub unassigned: i64,
    pub assigned: i64,
    pub resolved: i64,
    /// Sum of the three workflow counters above.
    pub total: i64,
    pub whatsapp: i64,
    pub instagram: i64,
    pub telegram: i64,
    pub total_tokens: i64,
}

/// Persisted sender configuration for one platform.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct PlatformRow {
    pub id: i64,
    pub platform: Channel,
    /// Page id (Instagram) or bot id.
    pub platform_id: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub phone_number_id: Option<String>,
    pub webhook_url: Option<String>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl std::fmt::Debug for PlatformRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformRow")
            .field("id", &self.id)
            .field("platform", &self.platform)
            .field("platform_id", &self.platform_id)
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .field("phone_number_id", &self.phone_number_id)
            .field("active", &self.active)
            .finish()
    }
}

/// Fields for creating or replacing a platform row.
#[derive(Debug, Clone, Default)]
pub struct PlatformUpsert {
    pub platform_id: Option<String>,
    pub token: Option<String>,
    pub phone_number_id: Option<String>,
    pub webhook_url: Option<String>,
    pub active: bool,
}

/// A reusable broadcast message. `channel = None` targets every contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastTemplate {
    pub id: i64,
    pub name: String,
    pub content: String,
    pub channel: Option<Channel>,
    pub active: bool,
    pub created_at: String,
}

/// Progress record of one broadcast run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastHistory {
    pub id: i64,
    pub template_id: i64,
    pub sent_by: String,
    pub sent_to: i64,
    pub successful: i64,
    pub failed: i64,
    pub status: String,
    pub created_at: String,
    pub completed_at: Option<String>,
}

/// Broadcast run status values.
pub const BROADCAST_PROCESSING: &str = "Processing";
pub const BROADCAST_COMPLETED: &str = "Completed";

/// Parse a channel column, failing the row conversion on unknown values.
pub(crate) fn channel_column(idx: usize, value: String) -> rusqlite::Result<Channel> {
    Channel::from_slug(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown channel `{value}`").into(),
        )
    })
}
