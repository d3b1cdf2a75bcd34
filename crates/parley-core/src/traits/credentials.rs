// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lookup of per-platform sender credentials.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::types::{Channel, PlatformCredentials};

/// Where platform senders read their credentials from.
///
/// Implemented by static configuration and by persisted platform rows.
/// `Ok(None)` means the platform is not configured.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn credentials(&self, channel: Channel)
        -> Result<Option<PlatformCredentials>, ParleyError>;
}

/// Credentials fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    entries: Vec<PlatformCredentials>,
}

impl StaticCredentials {
    pub fn new(entries: Vec<PlatformCredentials>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn credentials(
        &self,
        channel: Channel,
    ) -> Result<Option<PlatformCredentials>, ParleyError> {
        Ok(self.entries.iter().find(|c| c.channel == channel).cloned())
    }
}
