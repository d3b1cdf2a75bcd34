// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instagram webhook payload parsing.

use parley_core::{Channel, InboundMessage, ParleyError};
use serde::Deserialize;
use tracing::warn;

/// Display name used for Instagram senders; the webhook does not carry one.
pub const DEFAULT_SENDER_NAME: &str = "Instagram User";

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: Option<String>,
    /// Kept raw so one malformed event does not reject the whole batch.
    #[serde(default)]
    pub messaging: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct Messaging {
    pub sender: Participant,
    #[serde(default)]
    pub recipient: Option<Participant>,
    #[serde(default)]
    pub message: Option<IgMessage>,
}

#[derive(Debug, Deserialize)]
pub struct Participant {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct IgMessage {
    #[serde(default)]
    pub mid: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Set on copies of messages the page itself sent.
    #[serde(default)]
    pub is_echo: bool,
}

/// Parses a webhook body into every text message it carries, in payload order.
pub fn parse_webhook(body: &[u8]) -> Result<Vec<InboundMessage>, ParleyError> {
    let payload: WebhookPayload = serde_json::from_slice(body)
        .map_err(|e| ParleyError::InvalidPayload(format!("instagram webhook: {e}")))?;
    Ok(extract_messages(&payload))
}

pub fn extract_messages(payload: &WebhookPayload) -> Vec<InboundMessage> {
    payload
        .entry
        .iter()
        .flat_map(|entry| entry.messaging.iter())
        .filter_map(|raw| {
            let event = match serde_json::from_value::<Messaging>(raw.clone()) {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "skipping malformed instagram messaging event");
                    return None;
                }
            };
            let message = event.message.as_ref()?;
            if message.is_echo {
                return None;
            }
            let text = message.text.as_deref()?;
            if text.trim().is_empty() {
                return None;
            }
            Some(InboundMessage {
                channel: Channel::Instagram,
                sender_id: event.sender.id.clone(),
                sender_name: DEFAULT_SENDER_NAME.to_string(),
                text: text.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(sender: &str, text: &str) -> serde_json::Value {
        serde_json::json!({
            "sender": {"id": sender},
            "recipient": {"id": "PAGE"},
            "timestamp": 1700000000,
            "message": {"mid": "m1", "text": text}
        })
    }

    #[test]
    fn iterates_all_entries_and_events() {
        let body = serde_json::json!({
            "object": "instagram",
            "entry": [
                {"id": "PAGE", "time": 1, "messaging": [event("u1", "hello"), event("u2", "price?")]},
                {"id": "PAGE", "time": 2, "messaging": [event("u3", "thanks")]}
            ]
        })
        .to_string();

        let msgs = parse_webhook(body.as_bytes()).unwrap();
        let senders: Vec<_> = msgs.iter().map(|m| m.sender_id.as_str()).collect();
        assert_eq!(senders, ["u1", "u2", "u3"]);
        assert!(msgs.iter().all(|m| m.sender_name == DEFAULT_SENDER_NAME));
        assert!(msgs.iter().all(|m| m.channel == Channel::Instagram));
        assert_eq!(msgs[1].text, "price?");
    }

    #[test]
    fn skips_empty_echo_and_non_message_events() {
        let body = serde_json::json!({
            "object": "instagram",
            "entry": [{"id": "PAGE", "messaging": [
                event("u1", ""),
                {"sender": {"id": "PAGE"}, "recipient": {"id": "u1"},
                 "message": {"mid": "m2", "text": "our reply", "is_echo": true}},
                {"sender": {"id": "u1"}, "recipient": {"id": "PAGE"}, "read": {"mid": "m1"}},
                event("u2", "real question")
            ]}]
        })
        .to_string();

        let msgs = parse_webhook(body.as_bytes()).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].sender_id, "u2");
    }

    #[test]
    fn empty_payload_yields_nothing() {
        assert!(parse_webhook(br#"{"object":"instagram","entry":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn non_envelope_body_is_invalid_payload() {
        let bodies: [&[u8]; 3] = [b"not json", br#"[1, 2]"#, br#"{"entry": "x"}"#];
        for body in bodies {
            let err = parse_webhook(body).unwrap_err();
            assert!(matches!(err, ParleyError::InvalidPayload(_)));
        }
    }

    #[test]
    fn malformed_event_is_skipped_without_dropping_siblings() {
        let body = serde_json::json!({
            "object": "instagram",
            "entry": [{"id": "PAGE", "messaging": [
                event("111", "first"),
                {"sender": {"id": 222}, "recipient": {"id": "PAGE"}, "message": {"text": "numeric id"}},
                {"message": {"text": "no sender"}},
                event("333", "third")
            ]}]
        })
        .to_string();

        let msgs = parse_webhook(body.as_bytes()).unwrap();
        let senders: Vec<_> = msgs.iter().map(|m| m.sender_id.as_str()).collect();
        assert_eq!(senders, ["111", "333"]);
    }

    #[test]
    fn text_is_kept_verbatim() {
        let body = serde_json::json!({
            "object": "instagram",
            "entry": [{"id": "PAGE", "messaging": [event("u1", "  spaced out  ")]}]
        })
        .to_string();

        let msgs = parse_webhook(body.as_bytes()).unwrap();
        assert_eq!(msgs[0].text, "  spaced out  ");
    }
}
