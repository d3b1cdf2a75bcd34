// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for generative model integrations.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{GenerationRequest, GenerationResponse};

/// Adapter that produces a reply for one user message.
///
/// Fails only when the underlying API call fails; there is no retry.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ParleyError>;
}
