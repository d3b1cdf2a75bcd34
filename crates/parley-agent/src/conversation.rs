// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation log: one row per inbound or outbound leg, plus the
//! workflow transitions operators apply to legs.

use parley_config::model::PipelineConfig;
use parley_core::types::MessageStatus;
use parley_core::{Channel, ParleyError};
use parley_storage::queries::{contacts, messages};
use parley_storage::{now_timestamp, ChatStats, Contact, ConversationMessage, Database, NewMessage};
use tracing::{debug, info};

/// `assigned_to` of a leg owned by a human operator.
pub const HUMAN_ASSIGNEE: &str = "Human";

pub struct ConversationLog {
    db: Database,
    ai_assignee: String,
    ai_agent_name: String,
}

impl ConversationLog {
    pub fn new(db: Database, config: &PipelineConfig) -> Self {
        Self {
            db,
            ai_assignee: config.ai_assignee.clone(),
            ai_agent_name: config.ai_agent_name.clone(),
        }
    }

    /// Store an inbound leg with status `Unassigned`.
    pub async fn record_inbound(
        &self,
        contact: &Contact,
        channel: Channel,
        text: &str,
    ) -> Result<i64, ParleyError> {
        let msg = NewMessage {
            contact_id: contact.id,
            contact_name: contact.name.clone(),
            message: text.to_string(),
            response: None,
            channel,
            status: MessageStatus::Unassigned,
            assigned_to: None,
            assigned_agent: None,
            tokens_used: 0,
        };
        let id = messages::insert_message(&self.db, &msg, &now_timestamp()).await?;
        parley_prometheus::record_message(channel, "inbound");
        debug!(message_id = id, contact_id = contact.id, len = text.len(), "inbound leg stored");
        Ok(id)
    }

    /// Store an outbound leg carrying both texts, with status `Answered`.
    ///
    /// Ownership defaults to the configured AI assignee and agent name.
    #[allow(clippy::too_many_arguments)]
    pub async fn record_outbound(
        &self,
        contact: &Contact,
        channel: Channel,
        inbound_text: &str,
        reply_text: &str,
        tokens_used: u32,
        assigned_to: Option<&str>,
        assigned_agent: Option<&str>,
    ) -> Result<i64, ParleyError> {
        let msg = NewMessage {
            contact_id: contact.id,
            contact_name: contact.name.clone(),
            message: inbound_text.to_string(),
            response: Some(reply_text.to_string()),
            channel,
            status: MessageStatus::Answered,
            assigned_to: Some(assigned_to.unwrap_or(&self.ai_assignee).to_string()),
            assigned_agent: Some(assigned_agent.unwrap_or(&self.ai_agent_name).to_string()),
            tokens_used: i64::from(tokens_used),
        };
        let id = messages::insert_message(&self.db, &msg, &now_timestamp()).await?;
        parley_prometheus::record_message(channel, "outbound");
        parley_prometheus::record_tokens(tokens_used);
        debug!(message_id = id, contact_id = contact.id, tokens_used, "outbound leg stored");
        Ok(id)
    }

    pub async fn assign(
        &self,
        id: i64,
        assigned_to: &str,
        assigned_agent: &str,
    ) -> Result<ConversationMessage, ParleyError> {
        let found = messages::update_assignment(
            &self.db,
            id,
            MessageStatus::Assigned,
            assigned_to,
            assigned_agent,
            &now_timestamp(),
        )
        .await?;
        if !found {
            return Err(ParleyError::not_found("message", id));
        }
        info!(message_id = id, assigned_to, "conversation assigned");
        self.get(id).await
    }

    /// Mark a leg `Resolved`. Resolving an already resolved leg is a no-op.
    pub async fn resolve(&self, id: i64) -> Result<ConversationMessage, ParleyError> {
        let found =
            messages::set_status(&self.db, id, MessageStatus::Resolved, &now_timestamp()).await?;
        if !found {
            return Err(ParleyError::not_found("message", id));
        }
        self.get(id).await
    }

    /// Hand a leg to a human operator and record them as the contact's last agent.
    pub async fn take_over(
        &self,
        id: i64,
        agent_name: &str,
    ) -> Result<ConversationMessage, ParleyError> {
        let now = now_timestamp();
        let found = messages::update_assignment(
            &self.db,
            id,
            MessageStatus::Assigned,
            HUMAN_ASSIGNEE,
            agent_name,
            &now,
        )
        .await?;
        if !found {
            return Err(ParleyError::not_found("message", id));
        }
        let message = self.get(id).await?;
        contacts::set_last_agent(&self.db, message.contact_id, agent_name, "Human", &now).await?;
        info!(message_id = id, agent = agent_name, "conversation taken over");
        Ok(message)
    }

    /// Return a leg to the AI: status `Unassigned`, AI ownership.
    pub async fn back_to_ai(&self, id: i64) -> Result<ConversationMessage, ParleyError> {
        let now = now_timestamp();
        let found = messages::update_assignment(
            &self.db,
            id,
            MessageStatus::Unassigned,
            &self.ai_assignee,
            &self.ai_agent_name,
            &now,
        )
        .await?;
        if !found {
            return Err(ParleyError::not_found("message", id));
        }
        let message = self.get(id).await?;
        contacts::set_last_agent(&self.db, message.contact_id, "AI", "Bot", &now).await?;
        info!(message_id = id, "conversation handed back to AI");
        Ok(message)
    }

    /// Add a label; returns the resulting comma-separated list.
    pub async fn add_label(&self, id: i64, label: &str) -> Result<String, ParleyError> {
        messages::add_label(&self.db, id, label, &now_timestamp())
            .await?
            .ok_or_else(|| ParleyError::not_found("message", id))
    }

    pub async fn get(&self, id: i64) -> Result<ConversationMessage, ParleyError> {
        messages::get_message(&self.db, id)
            .await?
            .ok_or_else(|| ParleyError::not_found("message", id))
    }

    /// Legs of one contact, newest first.
    pub async fn list_for_contact(
        &self,
        contact_id: i64,
    ) -> Result<Vec<ConversationMessage>, ParleyError> {
        messages::list_for_contact(&self.db, contact_id).await
    }

    pub async fn list_by_status(
        &self,
        status: MessageStatus,
    ) -> Result<Vec<ConversationMessage>, ParleyError> {
        messages::list_by_status(&self.db, status).await
    }

    pub async fn stats(&self) -> Result<ChatStats, ParleyError> {
        messages::chat_stats(&self.db).await
    }
}
