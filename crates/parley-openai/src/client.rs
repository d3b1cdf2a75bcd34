// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible chat-completion endpoints.
//!
//! Single attempt per call: the pipeline decides what to do on failure.

use std::time::Duration;

use parley_core::error::truncate_body;
use parley_core::ParleyError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use crate::types::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse};

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OpenAiClient {
    /// Creates a client posting to `endpoint`. Without an API key no
    /// Authorization header is sent.
    pub fn new(
        api_key: Option<&str>,
        endpoint: String,
        timeout: Duration,
    ) -> Result<Self, ParleyError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                    ParleyError::Config(format!("invalid API key header value: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ParleyError::upstream(format!("failed to build HTTP client: {e}"), e))?;

        Ok(Self { client, endpoint })
    }

    /// Overrides the endpoint (for testing with wiremock).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.endpoint = url;
        self
    }

    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ParleyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ParleyError::upstream(format!("HTTP request failed: {e}"), e))?;

        let status = response.status();
        debug!(status = %status, model = %request.model, "completion response received");

        let body = response
            .text()
            .await
            .map_err(|e| ParleyError::upstream(format!("failed to read response body: {e}"), e))?;

        if !status.is_success() {
            if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(ParleyError::Upstream {
                    message: format!(
                        "completion API error ({}): {}",
                        api_err.error.type_.as_deref().unwrap_or("unknown"),
                        truncate_body(&api_err.error.message)
                    ),
                    status: Some(status.as_u16()),
                    source: None,
                });
            }
            return Err(ParleyError::upstream_status(
                "completion API",
                status.as_u16(),
                &body,
            ));
        }

        serde_json::from_str(&body)
            .map_err(|e| ParleyError::upstream(format!("failed to parse API response: {e}"), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.7,
            max_tokens: 500,
        }
    }

    fn test_client(uri: &str) -> OpenAiClient {
        OpenAiClient::new(Some("sk-test"), String::new(), Duration::from_secs(5))
            .unwrap()
            .with_base_url(format!("{uri}/v1/chat/completions"))
    }

    #[tokio::test]
    async fn complete_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Hello!"}}],
                "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = test_client(&server.uri()).complete(&test_request()).await.unwrap();
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.usage.unwrap().total_tokens, 12);
    }

    #[tokio::test]
    async fn api_error_envelope_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key", "type": "invalid_request_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete(&test_request())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("Incorrect API key"));
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete(&test_request())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        assert!(test_client(&server.uri())
            .complete(&test_request())
            .await
            .is_err());
    }
}
