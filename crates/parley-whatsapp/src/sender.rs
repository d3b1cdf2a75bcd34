// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text replies through the WhatsApp Cloud API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_config::model::WhatsAppConfig;
use parley_core::{
    AdapterType, Channel, CredentialSource, HealthStatus, ParleyError, PluginAdapter,
    SendOutcome, SenderAdapter,
};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextPayload<'a>,
}

#[derive(Debug, Serialize)]
struct TextPayload<'a> {
    preview_url: bool,
    body: &'a str,
}

/// Sender for WhatsApp, reading its access token and phone number id from a
/// [`CredentialSource`] on every send.
pub struct WhatsAppSender {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialSource>,
}

impl WhatsAppSender {
    pub fn new(
        config: &WhatsAppConfig,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, ParleyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ParleyError::upstream(format!("failed to build HTTP client: {e}"), e))?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Overrides the Graph API base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl PluginAdapter for WhatsAppSender {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sender
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        match self.credentials.credentials(Channel::WhatsApp).await? {
            Some(c) if c.active => Ok(HealthStatus::Healthy),
            Some(_) => Ok(HealthStatus::Degraded("platform inactive".into())),
            None => Ok(HealthStatus::Degraded("not configured".into())),
        }
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl SenderAdapter for WhatsAppSender {
    fn channel(&self) -> Channel {
        Channel::WhatsApp
    }

    async fn send(&self, recipient: &str, text: &str) -> Result<SendOutcome, ParleyError> {
        let Some(creds) = self.credentials.credentials(Channel::WhatsApp).await? else {
            info!("whatsapp not configured, reply not sent");
            return Ok(SendOutcome::Skipped("not configured".into()));
        };
        if !creds.active {
            info!("whatsapp platform inactive, reply not sent");
            return Ok(SendOutcome::Skipped("inactive".into()));
        }
        let Some(phone_number_id) = creds.account_id.as_deref().filter(|s| !s.is_empty()) else {
            info!("whatsapp phone number id missing, reply not sent");
            return Ok(SendOutcome::Skipped("phone number id missing".into()));
        };

        let url = format!("{}/{phone_number_id}/messages", self.base_url);
        let request = SendMessageRequest {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to: recipient,
            kind: "text",
            text: TextPayload {
                preview_url: false,
                body: text,
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&creds.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| ParleyError::upstream(format!("whatsapp send failed: {e}"), e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ParleyError::upstream(format!("failed to read whatsapp response: {e}"), e)
        })?;
        if !status.is_success() {
            return Err(ParleyError::upstream_status("whatsapp", status.as_u16(), &body));
        }

        debug!(len = text.len(), "whatsapp message accepted");
        Ok(SendOutcome::Delivered)
    }
}
