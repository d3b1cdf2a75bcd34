// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley conversation service.
//!
//! Provides the error taxonomy, the domain types shared by every crate, and
//! the adapter traits implemented by storage, embedding, generation and
//! platform sender crates.

pub mod error;
pub mod traits;
pub mod types;

pub use error::ParleyError;
pub use types::{
    AdapterType, Channel, HealthStatus, InboundMessage, MessageId, MessageStatus, SendOutcome,
    Temperature,
};

pub use traits::{
    CredentialSource, EmbeddingAdapter, PluginAdapter, ProviderAdapter, SenderAdapter,
    StaticCredentials, StorageAdapter,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlatformCredentials;

    #[test]
    fn channel_string_forms() {
        use std::str::FromStr;

        for channel in Channel::ALL {
            let s = channel.to_string();
            assert_eq!(s, channel.as_str());
            assert_eq!(Channel::from_str(&s).unwrap(), channel);
            assert_eq!(Channel::from_slug(channel.slug()), Some(channel));
        }
        assert_eq!(Channel::from_slug("WhatsApp"), Some(Channel::WhatsApp));
        assert_eq!(Channel::from_slug("sms"), None);
    }

    #[test]
    fn channel_serialization() {
        let json = serde_json::to_string(&Channel::Telegram).unwrap();
        assert_eq!(json, "\"Telegram\"");
        let parsed: Channel = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Channel::Telegram);
    }

    #[test]
    fn message_status_round_trip() {
        for status in [
            MessageStatus::Unassigned,
            MessageStatus::Assigned,
            MessageStatus::Resolved,
            MessageStatus::Answered,
        ] {
            assert_eq!(MessageStatus::from_str_value(status.as_str()), status);
        }
        assert_eq!(MessageStatus::from_str_value("bogus"), MessageStatus::Unassigned);
    }

    #[test]
    fn credentials_debug_redacts_token() {
        let creds = PlatformCredentials {
            channel: Channel::WhatsApp,
            token: "EAAG-secret".into(),
            account_id: Some("1234".into()),
            active: true,
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("EAAG-secret"));
        assert!(debug.contains("1234"));
    }

    #[tokio::test]
    async fn static_credentials_lookup() {
        let source = StaticCredentials::new(vec![PlatformCredentials {
            channel: Channel::Telegram,
            token: "123:abc".into(),
            account_id: None,
            active: true,
        }]);
        assert!(source.credentials(Channel::Telegram).await.unwrap().is_some());
        assert!(source.credentials(Channel::WhatsApp).await.unwrap().is_none());
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_sender_adapter<T: SenderAdapter>() {}
        fn _assert_provider_adapter<T: ProviderAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_embedding_adapter<T: EmbeddingAdapter>() {}
        fn _assert_credential_source<T: CredentialSource>() {}
    }
}
