// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./parley.toml` > `~/.config/parley/parley.toml` > `/etc/parley/parley.toml`
//! with environment variable overrides via `PARLEY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ParleyConfig;

/// Config sections addressable from the environment.
const SECTIONS: &[&str] = &[
    "server",
    "storage",
    "generation",
    "embedding",
    "retrieval",
    "contacts",
    "pipeline",
    "platforms",
    "whatsapp",
    "instagram",
    "telegram",
    "broadcast",
    "metrics",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/parley/parley.toml`
/// 3. `~/.config/parley/parley.toml`
/// 4. `./parley.toml`
/// 5. `PARLEY_*` environment variables
pub fn load_config() -> Result<ParleyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ParleyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ParleyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for XDG config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::file("/etc/parley/parley.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("parley/parley.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("parley.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `PARLEY_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `PARLEY_WHATSAPP_PHONE_NUMBER_ID` maps to `whatsapp.phone_number_id`.
fn env_provider() -> Env {
    Env::prefixed("PARLEY_").map(|key| {
        let key_str = key.as_str();
        for section in SECTIONS {
            if let Some(rest) = key_str
                .strip_prefix(section)
                .and_then(|r| r.strip_prefix('_'))
            {
                return format!("{section}.{rest}").into();
            }
        }
        key_str.to_string().into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("parley.toml", "[server]\nport = 4000\n")?;
            jail.set_env("PARLEY_WHATSAPP_PHONE_NUMBER_ID", "555123");
            jail.set_env("PARLEY_SERVER_LOG_LEVEL", "debug");

            let config = load_config_from_path(Path::new("parley.toml"))?;
            assert_eq!(config.server.port, 4000);
            assert_eq!(config.server.log_level, "debug");
            assert_eq!(config.whatsapp.phone_number_id.as_deref(), Some("555123"));
            Ok(())
        });
    }

    #[test]
    fn env_beats_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("parley.toml", "[telegram]\nbot_token = \"from-file\"\n")?;
            jail.set_env("PARLEY_TELEGRAM_BOT_TOKEN", "from-env");

            let config = load_config_from_path(Path::new("parley.toml"))?;
            assert_eq!(config.telegram.bot_token.as_deref(), Some("from-env"));
            Ok(())
        });
    }
}
