// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation pipeline for one inbound text message:
//! resolve contact, log inbound, retrieve, generate, log outbound, send.

use std::sync::Arc;

use parley_config::model::PipelineConfig;
use parley_core::types::GenerationRequest;
use parley_core::{InboundMessage, ParleyError, ProviderAdapter, SendOutcome};
use parley_storage::Contact;
use parley_vector::{HistoryQueue, NewChatHistory, Retriever};
use tracing::{debug, error, info, warn};

use crate::contacts::ContactResolver;
use crate::conversation::ConversationLog;
use crate::senders::SenderSet;

/// Result of running the pipeline for one message.
#[derive(Debug, Clone)]
pub struct Turn {
    pub contact: Contact,
    pub inbound_id: i64,
    /// `None` when the outbound leg could not be stored.
    pub outbound_id: Option<i64>,
    pub reply: String,
    /// `false` when the fallback reply was used.
    pub generated: bool,
    pub delivery: SendOutcome,
}

pub struct ConversationPipeline {
    resolver: ContactResolver,
    log: Arc<ConversationLog>,
    retriever: Arc<Retriever>,
    provider: Arc<dyn ProviderAdapter>,
    senders: SenderSet,
    history: Arc<HistoryQueue>,
    fallback_reply: String,
}

impl ConversationPipeline {
    pub fn new(
        resolver: ContactResolver,
        log: Arc<ConversationLog>,
        retriever: Arc<Retriever>,
        provider: Arc<dyn ProviderAdapter>,
        senders: SenderSet,
        history: Arc<HistoryQueue>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            resolver,
            log,
            retriever,
            provider,
            senders,
            history,
            fallback_reply: config.fallback_reply.clone(),
        }
    }

    pub fn senders(&self) -> &SenderSet {
        &self.senders
    }

    pub fn log(&self) -> &Arc<ConversationLog> {
        &self.log
    }

    pub fn history(&self) -> &Arc<HistoryQueue> {
        &self.history
    }

    /// Run the pipeline.
    ///
    /// Fails when the contact cannot be resolved, the inbound leg cannot be
    /// stored, or the platform rejects the reply. Generation failures are
    /// replaced by the fallback reply; retrieval never fails.
    pub async fn process(&self, inbound: &InboundMessage) -> Result<Turn, ParleyError> {
        let channel = inbound.channel;
        let contact = self
            .resolver
            .resolve(channel, &inbound.sender_id, &inbound.sender_name)
            .await?;
        let inbound_id = self.log.record_inbound(&contact, channel, &inbound.text).await?;

        let context = self.retriever.build_context(&inbound.text).await;
        debug!(contact_id = contact.id, context_len = context.len(), "context built");

        let request = GenerationRequest {
            user_message: inbound.text.clone(),
            contact_name: display_name(&contact),
            contact_id: contact.id,
            context,
        };
        let (reply, tokens_used, generated) = match self.provider.generate(request).await {
            Ok(response) => (response.text, response.tokens_used, true),
            Err(e) => {
                warn!(contact_id = contact.id, error = %e, "generation failed, using fallback reply");
                parley_prometheus::record_generation_failure();
                (self.fallback_reply.clone(), 0, false)
            }
        };

        let outbound_id = match self
            .log
            .record_outbound(&contact, channel, &inbound.text, &reply, tokens_used, None, None)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                error!(contact_id = contact.id, error = %e, "failed to store outbound leg");
                None
            }
        };

        if generated {
            self.history.enqueue(NewChatHistory {
                contact_id: contact.id,
                message: inbound.text.clone(),
                response: reply.clone(),
                sentiment: None,
                intent: None,
            });
        }

        let delivery = self.senders.send(channel, &inbound.sender_id, &reply).await?;
        info!(
            contact_id = contact.id,
            channel = %channel,
            generated,
            tokens_used,
            "conversation turn completed"
        );

        Ok(Turn {
            contact,
            inbound_id,
            outbound_id,
            reply,
            generated,
            delivery,
        })
    }
}

/// Name used in the prompt: the contact's name, or its code when unnamed.
fn display_name(contact: &Contact) -> String {
    if contact.name.trim().is_empty() {
        contact.code.clone()
    } else {
        contact.name.clone()
    }
}
