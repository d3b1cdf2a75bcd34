// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text replies through the Instagram Send API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_config::model::InstagramConfig;
use parley_core::{
    AdapterType, Channel, CredentialSource, HealthStatus, ParleyError, PluginAdapter,
    SendOutcome, SenderAdapter,
};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    recipient: Recipient<'a>,
    message: MessageBody<'a>,
    messaging_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    text: &'a str,
}

/// Instagram sender. The page access token travels as the `access_token`
/// query parameter, which is stripped from transport errors.
pub struct InstagramSender {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialSource>,
}

impl InstagramSender {
    pub fn new(
        config: &InstagramConfig,
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
impl PluginAdapter for InstagramSender {
    fn name(&self) -> &str {
        "instagram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sender
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        match self.credentials.credentials(Channel::Instagram).await? {
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
impl SenderAdapter for InstagramSender {
    fn channel(&self) -> Channel {
        Channel::Instagram
    }

    async fn send(&self, recipient: &str, text: &str) -> Result<SendOutcome, ParleyError> {
        let Some(creds) = self.credentials.credentials(Channel::Instagram).await? else {
            info!("instagram not configured, reply not sent");
            return Ok(SendOutcome::Skipped("not configured".into()));
        };
        if !creds.active {
            info!("instagram platform inactive, reply not sent");
            return Ok(SendOutcome::Skipped("inactive".into()));
        }

        let request = SendRequest {
            recipient: Recipient { id: recipient },
            message: MessageBody { text },
            messaging_type: "RESPONSE",
        };

        let response = self
            .client
            .post(format!("{}/me/messages", self.base_url))
            .query(&[("access_token", creds.token.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                ParleyError::upstream(format!("instagram send failed: {e}"), e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            let e = e.without_url();
            ParleyError::upstream(format!("failed to read instagram response: {e}"), e)
        })?;
        // The Send API answers 200, or 201 from some proxies.
        if !status.is_success() {
            return Err(ParleyError::upstream_status("instagram", status.as_u16(), &body));
        }

        debug!(len = text.len(), "instagram message accepted");
        Ok(SendOutcome::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::types::PlatformCredentials;
    use parley_core::StaticCredentials;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds(active: bool) -> Arc<dyn CredentialSource> {
        Arc::new(StaticCredentials::new(vec![PlatformCredentials {
            channel: Channel::Instagram,
            token: "page-token".into(),
            account_id: Some("PAGE".into()),
            active,
        }]))
    }

    fn sender(server: &MockServer, credentials: Arc<dyn CredentialSource>) -> InstagramSender {
        InstagramSender::new(&InstagramConfig::default(), credentials)
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn posts_response_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/me/messages"))
            .and(query_param("access_token", "page-token"))
            .and(body_json(serde_json::json!({
                "recipient": {"id": "IGSID"},
                "message": {"text": "Hi there"},
                "messaging_type": "RESPONSE"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "recipient_id": "IGSID", "message_id": "m_out"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = sender(&server, creds(true)).send("IGSID", "Hi there").await.unwrap();
        assert_eq!(outcome, SendOutcome::Delivered);
    }

    #[tokio::test]
    async fn created_counts_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let outcome = sender(&server, creds(true)).send("IGSID", "x").await.unwrap();
        assert_eq!(outcome, SendOutcome::Delivered);
    }

    #[tokio::test]
    async fn unconfigured_and_inactive_skip() {
        let server = MockServer::start().await;
        let none = sender(&server, Arc::new(StaticCredentials::default()))
            .send("IGSID", "x")
            .await
            .unwrap();
        assert_eq!(none, SendOutcome::Skipped("not configured".into()));

        let inactive = sender(&server, creds(false)).send("IGSID", "x").await.unwrap();
        assert_eq!(inactive, SendOutcome::Skipped("inactive".into()));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_status_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid recipient"))
            .mount(&server)
            .await;

        let err = sender(&server, creds(true)).send("IGSID", "x").await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(!err.to_string().contains("page-token"));
    }
}
