// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp webhook payload parsing.
//!
//! Only the first message of the first change of the first entry is
//! considered. Status callbacks and non-text messages carry no actionable
//! text and are dropped.

use parley_core::{Channel, InboundMessage, ParleyError};
use serde::Deserialize;

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
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: Option<String>,
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub contacts: Vec<WaContact>,
    #[serde(default)]
    pub messages: Vec<WaMessage>,
}

#[derive(Debug, Deserialize)]
pub struct WaContact {
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub wa_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct WaMessage {
    pub from: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<TextBody>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    #[serde(default)]
    pub body: String,
}

/// Parses a webhook body.
///
/// Returns `Ok(None)` when the payload is well-formed but carries no text
/// message, and `InvalidPayload` when the body is not a WhatsApp webhook.
pub fn parse_webhook(body: &[u8]) -> Result<Option<InboundMessage>, ParleyError> {
    let payload: WebhookPayload = serde_json::from_slice(body)
        .map_err(|e| ParleyError::InvalidPayload(format!("whatsapp webhook: {e}")))?;
    Ok(extract_message(&payload))
}

/// Extracts the first text message from a parsed payload.
pub fn extract_message(payload: &WebhookPayload) -> Option<InboundMessage> {
    let value = &payload.entry.first()?.changes.first()?.value;
    let message = value.messages.first()?;
    let text = message.text.as_ref()?.body.as_str();
    if text.trim().is_empty() {
        return None;
    }

    let sender_name = value
        .contacts
        .first()
        .and_then(|c| c.profile.as_ref())
        .map(|p| p.name.clone())
        .unwrap_or_default();

    Some(InboundMessage {
        channel: Channel::WhatsApp,
        sender_id: message.from.clone(),
        sender_name,
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_payload(from: &str, name: &str, body: &str) -> String {
        serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "WABA_ID",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {"display_phone_number": "15550000000", "phone_number_id": "PNID"},
                        "contacts": [{"profile": {"name": name}, "wa_id": from}],
                        "messages": [{
                            "from": from,
                            "id": "wamid.1",
                            "timestamp": "1700000000",
                            "type": "text",
                            "text": {"body": body}
                        }]
                    }
                }]
            }]
        })
        .to_string()
    }

    #[test]
    fn parses_text_message() {
        let body = text_payload("15551234567", "Ana", "What's your price for product X?");
        let msg = parse_webhook(body.as_bytes()).unwrap().unwrap();
        assert_eq!(msg.channel, Channel::WhatsApp);
        assert_eq!(msg.sender_id, "15551234567");
        assert_eq!(msg.sender_name, "Ana");
        assert_eq!(msg.text, "What's your price for product X?");
    }

    #[test]
    fn text_is_kept_verbatim() {
        let body = text_payload("1555", "Ana", "  hi there\n");
        let msg = parse_webhook(body.as_bytes()).unwrap().unwrap();
        assert_eq!(msg.text, "  hi there\n");
    }

    #[test]
    fn status_callback_is_dropped() {
        let body = serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{"id": "WABA_ID", "changes": [{"field": "messages", "value": {
                "messaging_product": "whatsapp",
                "statuses": [{"id": "wamid.1", "status": "delivered"}]
            }}]}]
        })
        .to_string();
        assert!(parse_webhook(body.as_bytes()).unwrap().is_none());
    }

    #[test]
    fn empty_entry_list_is_dropped() {
        assert!(parse_webhook(br#"{"object":"whatsapp_business_account","entry":[]}"#)
            .unwrap()
            .is_none());
    }

    #[test]
    fn blank_text_is_dropped() {
        let body = text_payload("1555", "Ana", "   ");
        assert!(parse_webhook(body.as_bytes()).unwrap().is_none());
    }

    #[test]
    fn image_message_is_dropped() {
        let body = serde_json::json!({
            "entry": [{"changes": [{"value": {
                "messages": [{"from": "1555", "type": "image", "image": {"id": "media"}}]
            }}]}]
        })
        .to_string();
        assert!(parse_webhook(body.as_bytes()).unwrap().is_none());
    }

    #[test]
    fn missing_contact_profile_gives_empty_name() {
        let body = serde_json::json!({
            "entry": [{"changes": [{"value": {
                "messages": [{"from": "1555", "type": "text", "text": {"body": "hi"}}]
            }}]}]
        })
        .to_string();
        let msg = parse_webhook(body.as_bytes()).unwrap().unwrap();
        assert_eq!(msg.sender_name, "");
    }

    #[test]
    fn malformed_body_is_invalid_payload() {
        let err = parse_webhook(b"not json").unwrap_err();
        assert!(matches!(err, ParleyError::InvalidPayload(_)));

        let err = parse_webhook(br#"{"entry": "nope"}"#).unwrap_err();
        assert!(matches!(err, ParleyError::InvalidPayload(_)));
    }
}
