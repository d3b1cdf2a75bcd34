// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that serde attributes cannot express,
//! such as value ranges, URL schemes, and non-empty strings.

use crate::diagnostic::ConfigError;
use crate::model::ParleyConfig;

const LOG_FORMATS: &[&str] = &["pretty", "json"];
const TEMPERATURES: &[&str] = &["Cold", "Warm", "Hot"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.server.port == 0 {
        fail("server.port must not be 0".to_string());
    }

    if !LOG_FORMATS.contains(&config.server.log_format.as_str()) {
        fail(format!(
            "server.log_format must be one of {}, got `{}`",
            LOG_FORMATS.join(", "),
            config.server.log_format
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let temperature = config.generation.temperature;
    if !(0.0..=2.0).contains(&temperature) {
        fail(format!(
            "generation.temperature must be between 0 and 2, got {temperature}"
        ));
    }

    if config.generation.max_tokens == 0 {
        fail("generation.max_tokens must be greater than 0".to_string());
    }

    if config.embedding.dimensions == 0 {
        fail("embedding.dimensions must be greater than 0".to_string());
    }

    if config.retrieval.knowledge_limit == 0 {
        fail("retrieval.knowledge_limit must be greater than 0".to_string());
    }

    if config.retrieval.faq_limit == 0 {
        fail("retrieval.faq_limit must be greater than 0".to_string());
    }

    if config.retrieval.history_queue_capacity == 0 {
        fail("retrieval.history_queue_capacity must be greater than 0".to_string());
    }

    if config.contacts.code_prefix.trim().is_empty() {
        fail("contacts.code_prefix must not be empty".to_string());
    }

    if !(1..=12).contains(&config.contacts.code_width) {
        fail(format!(
            "contacts.code_width must be between 1 and 12, got {}",
            config.contacts.code_width
        ));
    }

    if !TEMPERATURES.contains(&config.contacts.default_temperature.as_str()) {
        fail(format!(
            "contacts.default_temperature must be one of {}, got `{}`",
            TEMPERATURES.join(", "),
            config.contacts.default_temperature
        ));
    }

    let timeouts = [
        ("generation.timeout_secs", config.generation.timeout_secs),
        ("embedding.timeout_secs", config.embedding.timeout_secs),
        ("whatsapp.timeout_secs", config.whatsapp.timeout_secs),
        ("instagram.timeout_secs", config.instagram.timeout_secs),
        ("telegram.timeout_secs", config.telegram.timeout_secs),
    ];
    for (key, value) in timeouts {
        if value == 0 {
            fail(format!("{key} must be greater than 0"));
        }
    }

    let urls = [
        ("generation.endpoint", &config.generation.endpoint),
        ("embedding.endpoint", &config.embedding.endpoint),
        ("whatsapp.api_base_url", &config.whatsapp.api_base_url),
        ("instagram.api_base_url", &config.instagram.api_base_url),
        ("telegram.api_base_url", &config.telegram.api_base_url),
    ];
    for (key, value) in urls {
        if !(value.starts_with("http://") || value.starts_with("https://")) {
            fail(format!("{key} must be an http(s) URL, got `{value}`"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
