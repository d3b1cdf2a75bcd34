// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform sender trait (WhatsApp, Instagram, Telegram).

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Channel, SendOutcome};

/// Delivers a plain-text reply through one messaging platform.
///
/// An unconfigured or inactive platform yields `Ok(SendOutcome::Skipped(..))`,
/// never an error.
#[async_trait]
pub trait SenderAdapter: PluginAdapter {
    /// The platform this sender delivers to.
    fn channel(&self) -> Channel;

    /// Sends `text` to `recipient`.
    async fn send(&self, recipient: &str, text: &str) -> Result<SendOutcome, ParleyError>;
}
