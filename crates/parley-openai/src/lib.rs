// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible generative responder for the Parley conversation service.
//!
//! Implements [`ProviderAdapter`]: the system prompt is the configured persona
//! plus the retrieval context (when there is one), and the user turn carries
//! the contact's name in front of the question.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use parley_config::model::GenerationConfig;
use parley_core::types::{AdapterType, GenerationRequest, GenerationResponse, HealthStatus};
use parley_core::{ParleyError, PluginAdapter, ProviderAdapter};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{ChatCompletionRequest, ChatMessage};

/// Chat-completion responder.
pub struct OpenAiResponder {
    client: OpenAiClient,
    model: String,
    temperature: f32,
    max_tokens: u32,
    persona: String,
}

impl OpenAiResponder {
    pub fn new(config: &GenerationConfig) -> Result<Self, ParleyError> {
        let client = OpenAiClient::new(
            config.api_key.as_deref(),
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(model = %config.model, "completion provider initialized");
        Ok(Self::with_client(client, config))
    }

    /// Creates a responder with an existing client.
    pub fn with_client(client: OpenAiClient, config: &GenerationConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            persona: config.persona.replace("{agent_name}", &config.agent_name),
        }
    }

    /// Persona, followed by the context block and an instruction to use it.
    pub fn system_prompt(&self, context: &str) -> String {
        if context.trim().is_empty() {
            return self.persona.clone();
        }
        format!(
            "{}\n\nUse the following information to answer the customer's question:\n{}\n\
             Base your answer on this information when it is relevant.",
            self.persona, context
        )
    }

    pub fn to_completion_request(&self, request: &GenerationRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(self.system_prompt(&request.context)),
                ChatMessage::user(user_turn(&request.contact_name, &request.user_message)),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// `"<name> asks: <message>"`.
pub fn user_turn(contact_name: &str, message: &str) -> String {
    format!("{contact_name} asks: {message}")
}

#[async_trait]
impl PluginAdapter for OpenAiResponder {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiResponder {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ParleyError> {
        let completion = self
            .client
            .complete(&self.to_completion_request(&request))
            .await?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ParleyError::Upstream {
                message: "completion API returned no choices".to_string(),
                status: None,
                source: None,
            })?;
        let tokens_used = completion.usage.map(|u| u.total_tokens).unwrap_or(0);

        debug!(
            contact_id = request.contact_id,
            tokens_used,
            reply_len = text.len(),
            "reply generated"
        );
        Ok(GenerationResponse { text, tokens_used })
    }
}
