// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parley conversation service.

use thiserror::Error;

/// Longest upstream response body kept inside an error, in bytes.
pub const MAX_ERROR_BODY: usize = 512;

/// The primary error type used across all Parley adapter traits and core operations.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// Startup configuration errors (invalid TOML, bad values, unusable settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// A contact, message, template or other record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A platform or AI engine has no usable configuration.
    ///
    /// Soft at the send boundary: senders log and return success instead.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Non-2xx, transport, or malformed-body failure from an external API.
    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        status: Option<u16>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Inbound payload or request body does not have the expected shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A recipient identifier cannot be used by the target platform.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Storage backend errors (database open, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Shorthand for a [`ParleyError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Builds an upstream error for a non-success HTTP response.
    ///
    /// The body is truncated to [`MAX_ERROR_BODY`] bytes.
    pub fn upstream_status(service: &str, status: u16, body: &str) -> Self {
        Self::Upstream {
            message: format!("{service} returned {status}: {}", truncate_body(body)),
            status: Some(status),
            source: None,
        }
    }

    /// Builds an upstream error wrapping a transport or decoding failure.
    pub fn upstream<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Upstream {
            message: message.into(),
            status: None,
            source: Some(Box::new(source)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_configuration_missing(&self) -> bool {
        matches!(self, Self::ConfigurationMissing(_))
    }

    /// HTTP status carried by an upstream error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}

/// Truncate a response body for diagnostics without splitting a UTF-8 character.
pub fn truncate_body(body: &str) -> &str {
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
