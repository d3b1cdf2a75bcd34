// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text replies through the Telegram Bot API `sendMessage` method.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_config::model::TelegramConfig;
use parley_core::{
    AdapterType, Channel, CredentialSource, HealthStatus, ParleyError, PluginAdapter,
    SendOutcome, SenderAdapter,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Normalizes a chat id to the numeric form the Bot API requires.
pub fn parse_chat_id(recipient: &str) -> Result<i64, ParleyError> {
    recipient
        .trim()
        .parse::<i64>()
        .map_err(|_| ParleyError::InvalidRecipient(format!("telegram chat id {recipient:?}")))
}

/// Telegram sender. The bot token is part of the request path, so transport
/// errors are stripped of their URL.
pub struct TelegramSender {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialSource>,
}

impl TelegramSender {
    pub fn new(
        config: &TelegramConfig,
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

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl PluginAdapter for TelegramSender {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sender
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        match self.credentials.credentials(Channel::Telegram).await? {
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
impl SenderAdapter for TelegramSender {
    fn channel(&self) -> Channel {
        Channel::Telegram
    }

    async fn send(&self, recipient: &str, text: &str) -> Result<SendOutcome, ParleyError> {
        let Some(creds) = self.credentials.credentials(Channel::Telegram).await? else {
            info!("telegram not configured, reply not sent");
            return Ok(SendOutcome::Skipped("not configured".into()));
        };
        if !creds.active {
            info!("telegram platform inactive, reply not sent");
            return Ok(SendOutcome::Skipped("inactive".into()));
        }
        let chat_id = parse_chat_id(recipient)?;

        let url = format!("{}/bot{}/sendMessage", self.base_url, creds.token);
        let response = self
            .client
            .post(&url)
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                ParleyError::upstream(format!("telegram send failed: {e}"), e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            let e = e.without_url();
            ParleyError::upstream(format!("failed to read telegram response: {e}"), e)
        })?;
        if !status.is_success() {
            return Err(ParleyError::upstream_status("telegram", status.as_u16(), &body));
        }

        let api: ApiResponse = serde_json::from_str(&body)
            .map_err(|e| ParleyError::upstream(format!("malformed telegram response: {e}"), e))?;
        if !api.ok {
            return Err(ParleyError::Upstream {
                message: format!(
                    "telegram rejected message: {}",
                    api.description.as_deref().unwrap_or("no description")
                ),
                status: Some(status.as_u16()),
                source: None,
            });
        }

        debug!(chat_id, len = text.len(), "telegram message accepted");
        Ok(SendOutcome::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::types::PlatformCredentials;
    use parley_core::StaticCredentials;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds() -> Arc<dyn CredentialSource> {
        Arc::new(StaticCredentials::new(vec![PlatformCredentials {
            channel: Channel::Telegram,
            token: "123:ABC".into(),
            account_id: None,
            active: true,
        }]))
    }

    fn sender(server: &MockServer, credentials: Arc<dyn CredentialSource>) -> TelegramSender {
        TelegramSender::new(&TelegramConfig::default(), credentials)
            .unwrap()
            .with_base_url(server.uri())
    }

    #[test]
    fn chat_id_normalization() {
        assert_eq!(parse_chat_id("42").unwrap(), 42);
        assert_eq!(parse_chat_id(" -100123 ").unwrap(), -100123);
        assert!(matches!(
            parse_chat_id("@channel"),
            Err(ParleyError::InvalidRecipient(_))
        ));
    }

    #[tokio::test]
    async fn posts_numeric_chat_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/sendMessage"))
            .and(body_json(serde_json::json!({"chat_id": 42, "text": "Hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true, "result": {"message_id": 7}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = sender(&server, creds()).send("42", "Hello").await.unwrap();
        assert_eq!(outcome, SendOutcome::Delivered);
    }

    #[tokio::test]
    async fn invalid_recipient_makes_no_request() {
        let server = MockServer::start().await;
        let err = sender(&server, creds()).send("not-a-number", "x").await.unwrap_err();
        assert!(matches!(err, ParleyError::InvalidRecipient(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_skips_before_parsing() {
        let server = MockServer::start().await;
        let outcome = sender(&server, Arc::new(StaticCredentials::default()))
            .send("not-a-number", "x")
            .await
            .unwrap();
        assert_eq!(outcome, SendOutcome::Skipped("not configured".into()));
    }

    #[tokio::test]
    async fn api_error_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "ok": false, "error_code": 403, "description": "Forbidden: bot was blocked by the user"
            })))
            .mount(&server)
            .await;

        let err = sender(&server, creds()).send("42", "x").await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains("blocked"));
        assert!(!err.to_string().contains("123:ABC"));
    }

    #[tokio::test]
    async fn ok_false_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false, "description": "chat not found"
            })))
            .mount(&server)
            .await;

        let err = sender(&server, creds()).send("42", "x").await.unwrap_err();
        assert!(err.to_string().contains("chat not found"));
    }
}
