// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform sender that records what it would have sent.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parley_core::{
    AdapterType, Channel, HealthStatus, ParleyError, PluginAdapter, SendOutcome, SenderAdapter,
};

enum Failure {
    Never,
    Always,
    For(String),
}

pub struct RecordingSender {
    channel: Channel,
    failure: Failure,
    attempts: AtomicUsize,
    shut_down: AtomicBool,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            failure: Failure::Never,
            attempts: AtomicUsize::new(0),
            shut_down: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// A sender whose platform rejects every message with a 500.
    pub fn failing(channel: Channel) -> Self {
        Self {
            failure: Failure::Always,
            ..Self::new(channel)
        }
    }

    /// A sender whose platform rejects messages to `recipient` only.
    pub fn failing_for(channel: Channel, recipient: impl Into<String>) -> Self {
        Self {
            failure: Failure::For(recipient.into()),
            ..Self::new(channel)
        }
    }

    /// Delivered `(recipient, text)` pairs, in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Send calls including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for RecordingSender {
    fn name(&self) -> &str {
        "recording-sender"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sender
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl SenderAdapter for RecordingSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, recipient: &str, text: &str) -> Result<SendOutcome, ParleyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let rejected = match &self.failure {
            Failure::Never => false,
            Failure::Always => true,
            Failure::For(target) => target == recipient,
        };
        if rejected {
            return Err(ParleyError::upstream_status(
                self.channel.slug(),
                500,
                "internal error",
            ));
        }
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((recipient.to_string(), text.to_string()));
        Ok(SendOutcome::Delivered)
    }
}
