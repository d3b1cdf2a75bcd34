// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible embedding client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use parley_config::model::EmbeddingConfig;
use parley_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use parley_core::{EmbeddingAdapter, ParleyError, PluginAdapter};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Embedding adapter calling an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// Build the client. Without an API key no Authorization header is sent.
    pub fn new(config: &EmbeddingConfig, api_key: Option<&str>) -> Result<Self, ParleyError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                ParleyError::Config(format!("invalid embedding API key header value: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ParleyError::upstream("failed to build HTTP client", e))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

#[async_trait]
impl PluginAdapter for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for OpenAiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, ParleyError> {
        if input.texts.is_empty() {
            return Ok(EmbeddingOutput {
                embeddings: Vec::new(),
                dimensions: self.dimensions,
            });
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest {
                input: &input.texts,
                model: &self.model,
            })
            .send()
            .await
            .map_err(|e| ParleyError::upstream(format!("embedding request failed: {e}"), e))?;

        let status = response.status();
        debug!(status = %status, texts = input.texts.len(), "embedding response received");

        let body = response
            .text()
            .await
            .map_err(|e| ParleyError::upstream(format!("failed to read embedding body: {e}"), e))?;
        if !status.is_success() {
            return Err(ParleyError::upstream_status("embedding API", status.as_u16(), &body));
        }

        let mut parsed: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|e| ParleyError::upstream(format!("malformed embedding response: {e}"), e))?;
        if parsed.data.len() != input.texts.len() {
            return Err(ParleyError::Upstream {
                message: format!(
                    "embedding API returned {} vectors for {} inputs",
                    parsed.data.len(),
                    input.texts.len()
                ),
                status: Some(status.as_u16()),
                source: None,
            });
        }
        parsed.data.sort_by_key(|d| d.index);

        Ok(EmbeddingOutput {
            embeddings: parsed.data.into_iter().map(|d| d.embedding).collect(),
            dimensions: self.dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> EmbeddingConfig {
        EmbeddingConfig {
            endpoint: format!("{}/v1/embeddings", server.uri()),
            dimensions: 3,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn embeds_in_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "text-embedding-ada-002",
                "input": ["first", "second"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"index": 1, "embedding": [0.0, 1.0, 0.0]},
                    {"index": 0, "embedding": [1.0, 0.0, 0.0]}
                ]
            })))
            .mount(&server)
            .await;

        let embedder = OpenAiEmbedder::new(&config_for(&server), Some("sk-test")).unwrap();
        let output = embedder
            .embed(EmbeddingInput {
                texts: vec!["first".into(), "second".into()],
            })
            .await
            .unwrap();
        assert_eq!(output.embeddings, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
        assert_eq!(output.dimensions, 3);
    }

    #[tokio::test]
    async fn non_success_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let embedder = OpenAiEmbedder::new(&config_for(&server), None).unwrap();
        let err = embedder
            .embed(EmbeddingInput {
                texts: vec!["x".into()],
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn empty_data_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let embedder = OpenAiEmbedder::new(&config_for(&server), None).unwrap();
        assert!(embedder
            .embed(EmbeddingInput {
                texts: vec!["x".into()],
            })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn empty_input_skips_request() {
        let server = MockServer::start().await;
        let embedder = OpenAiEmbedder::new(&config_for(&server), None).unwrap();
        let output = embedder.embed(EmbeddingInput { texts: vec![] }).await.unwrap();
        assert!(output.embeddings.is_empty());
    }
}
