// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The set of platform senders, selected by channel.

use std::collections::HashMap;
use std::sync::Arc;

use parley_core::{Channel, ParleyError, SendOutcome, SenderAdapter};
use tracing::{info, warn};

#[derive(Clone, Default)]
pub struct SenderSet {
    senders: HashMap<Channel, Arc<dyn SenderAdapter>>,
}

impl SenderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sender under its own channel, replacing any previous one.
    pub fn with(mut self, sender: Arc<dyn SenderAdapter>) -> Self {
        self.senders.insert(sender.channel(), sender);
        self
    }

    pub fn get(&self, channel: Channel) -> Option<&Arc<dyn SenderAdapter>> {
        self.senders.get(&channel)
    }

    /// Shut down every registered sender. Errors are logged, not returned.
    pub async fn shutdown(&self) {
        for (channel, sender) in &self.senders {
            if let Err(e) = sender.shutdown().await {
                warn!(channel = %channel, error = %e, "sender shutdown failed");
            }
        }
    }

    /// Send through the sender registered for `channel`.
    ///
    /// A channel without a sender is skipped like an unconfigured platform.
    pub async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        text: &str,
    ) -> Result<SendOutcome, ParleyError> {
        let Some(sender) = self.senders.get(&channel) else {
            info!(channel = %channel, "no sender registered, reply not sent");
            parley_prometheus::record_send(channel, "skipped");
            return Ok(SendOutcome::Skipped("no sender registered".into()));
        };

        match sender.send(recipient, text).await {
            Ok(SendOutcome::Delivered) => {
                parley_prometheus::record_send(channel, "delivered");
                Ok(SendOutcome::Delivered)
            }
            Ok(SendOutcome::Skipped(reason)) => {
                parley_prometheus::record_send(channel, "skipped");
                Ok(SendOutcome::Skipped(reason))
            }
            Err(e) => {
                warn!(channel = %channel, error = %e, "send failed");
                parley_prometheus::record_send(channel, "failed");
                Err(e)
            }
        }
    }
}
