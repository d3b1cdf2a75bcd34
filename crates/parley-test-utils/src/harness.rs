// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full webhook stack over a temp SQLite
//! database: contact resolver, conversation log, retriever with a
//! [`MockEmbedder`], a [`MockResponder`] and one [`RecordingSender`] per
//! channel. [`TestHarness::router`] returns the HTTP router wired to it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use parley_agent::{
    Broadcaster, ContactResolver, ConversationLog, ConversationPipeline, SenderSet,
    WebhookDispatcher,
};
use parley_config::model::ParleyConfig;
use parley_core::{Channel, EmbeddingAdapter, ParleyError};
use parley_gateway::{GatewayState, HealthState, build_router};
use parley_storage::Database;
use parley_vector::{HistoryQueue, Retriever, VectorStore};

use crate::mock_embedder::MockEmbedder;
use crate::mock_responder::MockResponder;
use crate::recording_sender::RecordingSender;

pub const VERIFY_TOKEN: &str = "test-verify-token";
const EMBEDDING_DIMENSIONS: usize = 64;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    replies: Vec<String>,
    failing_responder: bool,
    failing_channels: Vec<Channel>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            replies: Vec::new(),
            failing_responder: false,
            failing_channels: Vec::new(),
        }
    }

    /// Queue responder replies, consumed in order.
    pub fn with_replies(mut self, replies: Vec<String>) -> Self {
        self.replies = replies;
        self
    }

    /// Make every generation call fail.
    pub fn with_failing_responder(mut self) -> Self {
        self.failing_responder = true;
        self
    }

    /// Make the platform reject every message sent on `channel`.
    pub fn with_failing_sender(mut self, channel: Channel) -> Self {
        self.failing_channels.push(channel);
        self
    }

    pub async fn build(self) -> Result<TestHarness, ParleyError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| ParleyError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("parley.db");
        let db = Database::open(&db_path.to_string_lossy()).await?;

        let mut config = ParleyConfig::default();
        config.whatsapp.verify_token = Some(VERIFY_TOKEN.into());
        config.instagram.verify_token = Some(VERIFY_TOKEN.into());
        config.telegram.verify_token = Some(VERIFY_TOKEN.into());

        let embedder: Arc<dyn EmbeddingAdapter> =
            Arc::new(MockEmbedder::new(EMBEDDING_DIMENSIONS));
        let retriever = Arc::new(Retriever::new(
            VectorStore::new(db.clone(), EMBEDDING_DIMENSIONS),
            embedder,
            &config.retrieval,
        ));
        let (history, _failures) =
            HistoryQueue::spawn(retriever.clone(), config.retrieval.history_queue_capacity);
        let history = Arc::new(history);

        let responder = Arc::new(if self.failing_responder {
            MockResponder::failing()
        } else {
            MockResponder::with_replies(self.replies)
        });

        let mut senders = HashMap::new();
        let mut sender_set = SenderSet::new();
        for channel in Channel::ALL {
            let sender = Arc::new(if self.failing_channels.contains(&channel) {
                RecordingSender::failing(channel)
            } else {
                RecordingSender::new(channel)
            });
            sender_set = sender_set.with(sender.clone());
            senders.insert(channel, sender);
        }

        let log = Arc::new(ConversationLog::new(db.clone(), &config.pipeline));
        let pipeline = Arc::new(ConversationPipeline::new(
            ContactResolver::new(db.clone(), &config.contacts),
            log.clone(),
            retriever.clone(),
            responder.clone(),
            sender_set.clone(),
            history.clone(),
            &config.pipeline,
        ));
        let dispatcher = Arc::new(WebhookDispatcher::new(pipeline, &config));
        let broadcaster = Arc::new(Broadcaster::new(
            db.clone(),
            sender_set,
            Duration::from_millis(0),
        ));

        let state = GatewayState {
            dispatcher,
            log,
            retriever,
            broadcaster,
            db: db.clone(),
            health: HealthState::new(None),
        };

        Ok(TestHarness {
            db,
            responder,
            senders,
            history,
            state,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete webhook environment with mock adapters and temp storage.
pub struct TestHarness {
    pub db: Database,
    pub responder: Arc<MockResponder>,
    pub senders: HashMap<Channel, Arc<RecordingSender>>,
    pub history: Arc<HistoryQueue>,
    pub state: GatewayState,
    pub config: ParleyConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The HTTP router over this harness's state.
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// The recording sender for `channel`.
    pub fn sender(&self, channel: Channel) -> &RecordingSender {
        // Every channel is registered in `build`.
        &self.senders[&channel]
    }

    /// Wait for queued chat-history writes to land.
    pub async fn flush_history(&self) {
        self.history.flush().await;
    }
}
