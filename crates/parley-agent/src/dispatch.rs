// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook dispatch: verification handshakes and per-platform delivery
//! handling.
//!
//! WhatsApp and Telegram get a best-effort apology when processing fails and
//! the failure is reported to the caller. Instagram failures are logged and
//! the remaining events of the delivery are still processed, so the platform
//! does not redeliver the whole batch.

use std::collections::HashMap;
use std::sync::Arc;

use parley_config::ParleyConfig;
use parley_core::{Channel, InboundMessage, ParleyError};
use tracing::{debug, error, warn};

use crate::pipeline::ConversationPipeline;

/// What happened to one webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Number of messages run through the pipeline.
    Processed(usize),
    /// The payload carried no actionable message.
    Dropped,
}

pub struct WebhookDispatcher {
    pipeline: Arc<ConversationPipeline>,
    verify_tokens: HashMap<Channel, String>,
    error_reply: String,
}

impl WebhookDispatcher {
    pub fn new(pipeline: Arc<ConversationPipeline>, config: &ParleyConfig) -> Self {
        let verify_tokens = Channel::ALL
            .into_iter()
            .filter_map(|c| config.verify_token(c).map(|t| (c, t.to_string())))
            .collect();
        Self {
            pipeline,
            verify_tokens,
            error_reply: config.pipeline.error_reply.clone(),
        }
    }

    pub fn pipeline(&self) -> &Arc<ConversationPipeline> {
        &self.pipeline
    }

    /// Subscription handshake. Returns the challenge to echo back, or `None`
    /// when the request must be refused.
    ///
    /// Succeeds only for mode `subscribe` with the platform's configured
    /// verify token; a platform without a verify token refuses everything.
    pub fn verify(
        &self,
        channel: Channel,
        mode: Option<&str>,
        token: Option<&str>,
        challenge: Option<&str>,
    ) -> Option<String> {
        let expected = self.verify_tokens.get(&channel)?;
        if mode == Some("subscribe") && token == Some(expected.as_str()) {
            Some(challenge.unwrap_or_default().to_string())
        } else {
            warn!(channel = %channel, "webhook verification refused");
            None
        }
    }

    /// Handle a webhook delivery body.
    ///
    /// `InvalidPayload` means the body does not have the platform's shape.
    pub async fn dispatch(
        &self,
        channel: Channel,
        body: &[u8],
    ) -> Result<DispatchOutcome, ParleyError> {
        let result = match channel {
            Channel::WhatsApp => match parley_whatsapp::parse_webhook(body) {
                Ok(message) => self.dispatch_single(message).await,
                Err(e) => Err(e),
            },
            Channel::Telegram => match parley_telegram::parse_webhook(body) {
                Ok(message) => self.dispatch_single(message).await,
                Err(e) => Err(e),
            },
            Channel::Instagram => match parley_instagram::parse_webhook(body) {
                Ok(messages) => Ok(self.dispatch_batch(messages).await),
                Err(e) => Err(e),
            },
        };

        let outcome = match &result {
            Ok(DispatchOutcome::Processed(_)) => "processed",
            Ok(DispatchOutcome::Dropped) => "dropped",
            Err(ParleyError::InvalidPayload(_)) => "invalid",
            Err(_) => "failed",
        };
        parley_prometheus::record_webhook(channel, outcome);
        result
    }

    async fn dispatch_single(
        &self,
        message: Option<InboundMessage>,
    ) -> Result<DispatchOutcome, ParleyError> {
        let Some(message) = message else {
            debug!("webhook carried no text message");
            return Ok(DispatchOutcome::Dropped);
        };

        match self.pipeline.process(&message).await {
            Ok(_) => Ok(DispatchOutcome::Processed(1)),
            Err(e) => {
                error!(channel = %message.channel, error = %e, "failed to process message");
                self.send_error_reply(&message).await;
                Err(e)
            }
        }
    }

    async fn dispatch_batch(&self, messages: Vec<InboundMessage>) -> DispatchOutcome {
        if messages.is_empty() {
            debug!("webhook carried no text message");
            return DispatchOutcome::Dropped;
        }

        let mut processed = 0;
        for message in &messages {
            match self.pipeline.process(message).await {
                Ok(_) => processed += 1,
                Err(e) => {
                    error!(channel = %message.channel, error = %e, "failed to process message, skipping");
                }
            }
        }
        DispatchOutcome::Processed(processed)
    }

    async fn send_error_reply(&self, message: &InboundMessage) {
        if let Err(e) = self
            .pipeline
            .senders()
            .send(message.channel, &message.sender_id, &self.error_reply)
            .await
        {
            warn!(channel = %message.channel, error = %e, "failed to send error reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_config::model::{ContactsConfig, RetrievalConfig};
    use parley_core::{EmbeddingAdapter, SenderAdapter};
    use parley_storage::queries::contacts;
    use parley_storage::Database;
    use parley_test_utils::{MockEmbedder, MockResponder, RecordingSender};
    use parley_vector::{HistoryQueue, Retriever, VectorStore};

    use crate::contacts::ContactResolver;
    use crate::conversation::ConversationLog;
    use crate::senders::SenderSet;

    struct Fixture {
        dispatcher: WebhookDispatcher,
        db: Database,
        senders: HashMap<Channel, Arc<RecordingSender>>,
        _dir: tempfile::TempDir,
    }

    /// Every channel gets a recording sender; `replacement` takes the slot of
    /// its own channel.
    async fn fixture(config: ParleyConfig, replacement: Option<RecordingSender>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("d.db").to_str().unwrap())
            .await
            .unwrap();
        let embedder: Arc<dyn EmbeddingAdapter> = Arc::new(MockEmbedder::new(32));
        let retriever = Arc::new(Retriever::new(
            VectorStore::new(db.clone(), 32),
            embedder,
            &RetrievalConfig::default(),
        ));
        let (history, _failures) = HistoryQueue::spawn(retriever.clone(), 16);

        let mut senders: HashMap<Channel, Arc<RecordingSender>> = Channel::ALL
            .into_iter()
            .map(|c| (c, Arc::new(RecordingSender::new(c))))
            .collect();
        if let Some(sender) = replacement {
            senders.insert(sender.channel(), Arc::new(sender));
        }
        let set = senders
            .values()
            .fold(SenderSet::new(), |set, sender| set.with(sender.clone()));

        let pipeline = ConversationPipeline::new(
            ContactResolver::new(db.clone(), &ContactsConfig::default()),
            Arc::new(ConversationLog::new(db.clone(), &config.pipeline)),
            retriever,
            Arc::new(MockResponder::new()),
            set,
            Arc::new(history),
            &config.pipeline,
        );
        Fixture {
            dispatcher: WebhookDispatcher::new(Arc::new(pipeline), &config),
            db,
            senders,
            _dir: dir,
        }
    }

    fn config_with_tokens() -> ParleyConfig {
        let mut config = ParleyConfig::default();
        config.whatsapp.verify_token = Some("wa-secret".into());
        config
    }

    #[tokio::test]
    async fn verification_echoes_challenge_only_for_matching_token() {
        let f = fixture(config_with_tokens(), None).await;
        let d = &f.dispatcher;

        assert_eq!(
            d.verify(Channel::WhatsApp, Some("subscribe"), Some("wa-secret"), Some("1158201444")),
            Some("1158201444".to_string())
        );
        assert_eq!(
            d.verify(Channel::WhatsApp, Some("subscribe"), Some("wrong"), Some("1")),
            None
        );
        assert_eq!(
            d.verify(Channel::WhatsApp, Some("unsubscribe"), Some("wa-secret"), Some("1")),
            None
        );
        assert_eq!(d.verify(Channel::WhatsApp, None, None, Some("1")), None);
        // Telegram has no verify token configured.
        assert_eq!(
            d.verify(Channel::Telegram, Some("subscribe"), Some(""), Some("1")),
            None
        );
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn refused_verification_is_logged() {
        let f = fixture(config_with_tokens(), None).await;
        let refused = f
            .dispatcher
            .verify(Channel::WhatsApp, Some("subscribe"), Some("guess"), Some("c"));
        assert!(refused.is_none());
        assert!(logs_contain("webhook verification refused"));
    }

    #[tokio::test]
    async fn telegram_empty_text_is_dropped_without_rows() {
        let f = fixture(ParleyConfig::default(), None).await;
        let body = br#"{"update_id":1,"message":{"from":{"id":7,"first_name":"A"},"chat":{"id":7},"text":""}}"#;

        let outcome = f.dispatcher.dispatch(Channel::Telegram, body).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Dropped);
        assert!(contacts::list_contacts(&f.db, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_payload() {
        let f = fixture(ParleyConfig::default(), None).await;
        let err = f.dispatcher.dispatch(Channel::WhatsApp, b"{").await.unwrap_err();
        assert!(matches!(err, ParleyError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn instagram_processes_every_event() {
        let f = fixture(ParleyConfig::default(), None).await;
        let body = serde_json_body(&[("u1", "hi"), ("u2", "hello")]);

        let outcome = f.dispatcher.dispatch(Channel::Instagram, &body).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Processed(2));
        assert_eq!(f.senders[&Channel::Instagram].sent().len(), 2);
    }

    #[tokio::test]
    async fn instagram_send_failure_still_succeeds() {
        let f = fixture(
            ParleyConfig::default(),
            Some(RecordingSender::failing(Channel::Instagram)),
        )
        .await;
        let body = serde_json_body(&[("u1", "hi")]);

        let outcome = f.dispatcher.dispatch(Channel::Instagram, &body).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Processed(0));
    }

    #[tokio::test]
    async fn telegram_send_failure_is_reported() {
        let f = fixture(
            ParleyConfig::default(),
            Some(RecordingSender::failing(Channel::Telegram)),
        )
        .await;
        let body = br#"{"update_id":1,"message":{"from":{"id":7,"first_name":"A"},"chat":{"id":7},"text":"hi"}}"#;

        let err = f.dispatcher.dispatch(Channel::Telegram, body).await.unwrap_err();
        assert!(!matches!(err, ParleyError::InvalidPayload(_)));
        // The reply and the apology were both attempted.
        assert_eq!(f.senders[&Channel::Telegram].attempts(), 2);
    }

    async fn break_message_log(db: &Database) {
        db.connection()
            .call(|conn| conn.execute_batch("DROP TABLE conversation_messages"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn pipeline_failure_sends_error_reply_and_reports() {
        let f = fixture(ParleyConfig::default(), None).await;
        break_message_log(&f.db).await;
        let error_reply = ParleyConfig::default().pipeline.error_reply;

        let tg = br#"{"update_id":1,"message":{"from":{"id":7,"first_name":"A"},"chat":{"id":7},"text":"hi"}}"#;
        let err = f.dispatcher.dispatch(Channel::Telegram, tg).await.unwrap_err();
        assert!(!matches!(err, ParleyError::InvalidPayload(_)));
        assert_eq!(
            f.senders[&Channel::Telegram].sent(),
            vec![("7".to_string(), error_reply.clone())]
        );

        let wa = br#"{"entry":[{"changes":[{"value":{"contacts":[{"profile":{"name":"Ana"},"wa_id":"1555"}],"messages":[{"from":"1555","id":"w1","type":"text","text":{"body":"hola"}}]}}]}]}"#;
        assert!(f.dispatcher.dispatch(Channel::WhatsApp, wa).await.is_err());
        assert_eq!(
            f.senders[&Channel::WhatsApp].sent(),
            vec![("1555".to_string(), error_reply)]
        );
    }

    #[tokio::test]
    async fn instagram_failure_does_not_stop_later_events() {
        let f = fixture(
            ParleyConfig::default(),
            Some(RecordingSender::failing_for(Channel::Instagram, "u1")),
        )
        .await;
        let body = serde_json_body(&[("u1", "hi"), ("u2", "hello")]);

        let outcome = f.dispatcher.dispatch(Channel::Instagram, &body).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Processed(1));
        let ig = &f.senders[&Channel::Instagram];
        assert_eq!(ig.attempts(), 2);
        let sent = ig.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "u2");
    }

    fn serde_json_body(events: &[(&str, &str)]) -> Vec<u8> {
        let messaging: Vec<String> = events
            .iter()
            .map(|(sender, text)| {
                format!(
                    r#"{{"sender":{{"id":"{sender}"}},"recipient":{{"id":"PAGE"}},"message":{{"mid":"m","text":"{text}"}}}}"#
                )
            })
            .collect();
        format!(
            r#"{{"object":"instagram","entry":[{{"id":"PAGE","messaging":[{}]}}]}}"#,
            messaging.join(",")
        )
        .into_bytes()
    }
}
