// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Parley service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use parley_core::types::{Channel, PlatformCredentials};
use serde::{Deserialize, Serialize};

/// Top-level Parley configuration.
///
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// HTTP server and logging settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Chat-completion API settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Embedding API settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Retrieval (RAG) settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Contact creation defaults.
    #[serde(default)]
    pub contacts: ContactsConfig,

    /// Reply and attribution strings used by the pipeline.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Where sender credentials come from.
    #[serde(default)]
    pub platforms: PlatformsConfig,

    /// WhatsApp Cloud API settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Instagram messaging settings.
    #[serde(default)]
    pub instagram: InstagramConfig,

    /// Telegram Bot API settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Broadcast fan-out settings.
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Metrics settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl ParleyConfig {
    /// Sender credentials taken from the platform sections.
    ///
    /// Platforms without a token (or, for WhatsApp/Instagram, without an
    /// account id) are left out and therefore count as unconfigured.
    pub fn platform_credentials(&self) -> Vec<PlatformCredentials> {
        let mut out = Vec::new();
        if let (Some(token), Some(phone)) = (
            &self.whatsapp.access_token,
            &self.whatsapp.phone_number_id,
        ) {
            out.push(PlatformCredentials {
                channel: Channel::WhatsApp,
                token: token.clone(),
                account_id: Some(phone.clone()),
                active: true,
            });
        }
        if let (Some(token), Some(page)) = (&self.instagram.access_token, &self.instagram.page_id)
        {
            out.push(PlatformCredentials {
                channel: Channel::Instagram,
                token: token.clone(),
                account_id: Some(page.clone()),
                active: true,
            });
        }
        if let Some(token) = &self.telegram.bot_token {
            out.push(PlatformCredentials {
                channel: Channel::Telegram,
                token: token.clone(),
                account_id: None,
                active: true,
            });
        }
        out
    }

    /// Webhook verify token configured for a platform.
    pub fn verify_token(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::WhatsApp => self.whatsapp.verify_token.as_deref(),
            Channel::Instagram => self.instagram.verify_token.as_deref(),
            Channel::Telegram => self.telegram.verify_token.as_deref(),
        }
    }
}

/// HTTP server and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format: `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3002
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("parley").join("parley.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("parley.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Chat-completion API configuration (OpenAI-compatible).
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Bearer token for the completion endpoint.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Full URL of the chat-completions endpoint.
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,

    /// Model identifier.
    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Client-level request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Name the assistant introduces itself with.
    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    /// System persona. `{agent_name}` is replaced with `agent_name`.
    #[serde(default = "default_persona")]
    pub persona: String,
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("agent_name", &self.agent_name)
            .finish_non_exhaustive()
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_generation_endpoint(),
            model: default_generation_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            agent_name: default_agent_name(),
            persona: default_persona(),
        }
    }
}

fn default_generation_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    500
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_agent_name() -> String {
    "Diva".to_string()
}

fn default_persona() -> String {
    "You are {agent_name}, a friendly customer service assistant. \
     Answer briefly and politely, in the language the customer writes in. \
     If you do not know an answer, say that a team member will follow up."
        .to_string()
}

/// Embedding API configuration (OpenAI-compatible).
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Bearer token; falls back to `generation.api_key` when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector length every stored embedding must have.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_embedding_endpoint(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_endpoint() -> String {
    "https://api.openai.com/v1/embeddings".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_dimensions() -> usize {
    1536
}

/// Retrieval configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Knowledge entries included in a context block.
    #[serde(default = "default_knowledge_limit")]
    pub knowledge_limit: usize,

    /// FAQ entries included in a context block.
    #[serde(default = "default_faq_limit")]
    pub faq_limit: usize,

    /// Pending chat-history jobs before new ones are dropped.
    #[serde(default = "default_history_queue_capacity")]
    pub history_queue_capacity: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            knowledge_limit: default_knowledge_limit(),
            faq_limit: default_faq_limit(),
            history_queue_capacity: default_history_queue_capacity(),
        }
    }
}

fn default_knowledge_limit() -> usize {
    3
}

fn default_faq_limit() -> usize {
    2
}

fn default_history_queue_capacity() -> usize {
    256
}

/// Contact creation defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContactsConfig {
    /// Prefix of generated contact codes.
    #[serde(default = "default_code_prefix")]
    pub code_prefix: String,

    /// Zero-padded width of the numeric part.
    #[serde(default = "default_code_width")]
    pub code_width: usize,

    /// Temperature given to new contacts (Cold, Warm, Hot).
    #[serde(default = "default_contact_temperature")]
    pub default_temperature: String,
}

impl Default for ContactsConfig {
    fn default() -> Self {
        Self {
            code_prefix: default_code_prefix(),
            code_width: default_code_width(),
            default_temperature: default_contact_temperature(),
        }
    }
}

fn default_code_prefix() -> String {
    "C".to_string()
}

fn default_code_width() -> usize {
    6
}

fn default_contact_temperature() -> String {
    "Warm".to_string()
}

/// Reply and attribution strings used by the pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Sent and logged when generation fails.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,

    /// Sent by the dispatcher when processing an event fails.
    #[serde(default = "default_error_reply")]
    pub error_reply: String,

    /// `assigned_to` of AI-answered legs.
    #[serde(default = "default_ai_assignee")]
    pub ai_assignee: String,

    /// `assigned_agent` of AI-answered legs.
    #[serde(default = "default_ai_agent_name")]
    pub ai_agent_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fallback_reply: default_fallback_reply(),
            error_reply: default_error_reply(),
            ai_assignee: default_ai_assignee(),
            ai_agent_name: default_ai_agent_name(),
        }
    }
}

fn default_fallback_reply() -> String {
    "Sorry, our system is busy right now. Our team will get back to you shortly. 🙏".to_string()
}

fn default_error_reply() -> String {
    "Sorry, something went wrong. Please try again. 🙏".to_string()
}

fn default_ai_assignee() -> String {
    "AI Bot".to_string()
}

fn default_ai_agent_name() -> String {
    "AI Assistant".to_string()
}

/// Source of platform sender credentials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSourceKind {
    /// The `[whatsapp]`, `[instagram]` and `[telegram]` sections.
    #[default]
    Config,
    /// Rows of the `connected_platforms` table.
    Database,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformsConfig {
    #[serde(default)]
    pub source: CredentialSourceKind,
}

/// WhatsApp Cloud API configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Token expected in `hub.verify_token` during webhook verification.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// Graph API base URL including the version segment.
    #[serde(default = "default_graph_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub phone_number_id: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("verify_token", &self.verify_token.as_ref().map(|_| "[redacted]"))
            .field("api_base_url", &self.api_base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .field("phone_number_id", &self.phone_number_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            verify_token: None,
            api_base_url: default_graph_base_url(),
            access_token: None,
            phone_number_id: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_graph_base_url() -> String {
    "https://graph.facebook.com/v18.0".to_string()
}

/// Instagram messaging configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InstagramConfig {
    #[serde(default)]
    pub verify_token: Option<String>,

    #[serde(default = "default_graph_base_url")]
    pub api_base_url: String,

    /// Page access token.
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub page_id: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for InstagramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstagramConfig")
            .field("verify_token", &self.verify_token.as_ref().map(|_| "[redacted]"))
            .field("api_base_url", &self.api_base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .field("page_id", &self.page_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            verify_token: None,
            api_base_url: default_graph_base_url(),
            access_token: None,
            page_id: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Telegram Bot API configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    #[serde(default)]
    pub verify_token: Option<String>,

    #[serde(default = "default_telegram_base_url")]
    pub api_base_url: String,

    /// Bot token. `None` leaves Telegram unconfigured.
    #[serde(default)]
    pub bot_token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("verify_token", &self.verify_token.as_ref().map(|_| "[redacted]"))
            .field("api_base_url", &self.api_base_url)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[redacted]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            verify_token: None,
            api_base_url: default_telegram_base_url(),
            bot_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_telegram_base_url() -> String {
    "https://api.telegram.org".to_string()
}

/// Broadcast configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BroadcastConfig {
    /// Pause between two recipients, in milliseconds.
    #[serde(default = "default_broadcast_delay_ms")]
    pub delay_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_broadcast_delay_ms(),
        }
    }
}

fn default_broadcast_delay_ms() -> u64 {
    100
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve `/metrics`.
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}
