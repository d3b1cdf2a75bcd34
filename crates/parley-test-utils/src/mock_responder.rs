// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock generative responder.
//!
//! Replies are popped from a FIFO queue; when it is empty a default
//! "mock reply" is returned. Every request is recorded.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use parley_core::types::{GenerationRequest, GenerationResponse};
use parley_core::{AdapterType, HealthStatus, ParleyError, PluginAdapter, ProviderAdapter};

pub const DEFAULT_REPLY: &str = "mock reply";

pub struct MockResponder {
    replies: Mutex<VecDeque<String>>,
    fail: bool,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockResponder {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            ..Self::new()
        }
    }

    /// A responder whose every call fails like an unreachable API.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.replies).push_back(reply.into());
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock(&self.requests).clone()
    }
}

impl Default for MockResponder {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl PluginAdapter for MockResponder {
    fn name(&self) -> &str {
        "mock-responder"
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
impl ProviderAdapter for MockResponder {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ParleyError> {
        lock(&self.requests).push(request);
        if self.fail {
            return Err(ParleyError::upstream_status("mock", 503, "service unavailable"));
        }
        let text = lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| DEFAULT_REPLY.to_string());
        Ok(GenerationResponse {
            text,
            tokens_used: 30,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(msg: &str) -> GenerationRequest {
        GenerationRequest {
            user_message: msg.into(),
            contact_name: "Ana".into(),
            contact_id: 1,
            context: String::new(),
        }
    }

    #[tokio::test]
    async fn replies_in_order_then_default() {
        let r = MockResponder::with_replies(["one", "two"]);
        assert_eq!(r.generate(request("a")).await.unwrap().text, "one");
        assert_eq!(r.generate(request("b")).await.unwrap().text, "two");
        assert_eq!(r.generate(request("c")).await.unwrap().text, DEFAULT_REPLY);
        assert_eq!(r.requests().len(), 3);
    }

    #[tokio::test]
    async fn failing_records_and_errors() {
        let r = MockResponder::failing();
        assert!(r.generate(request("a")).await.is_err());
        assert_eq!(r.requests()[0].user_message, "a");
    }
}
