// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background queue that embeds and stores answered exchanges.
//!
//! The reply path only enqueues; a single worker task does the embedding and
//! the write. Failures are reported on a dedicated channel so they never
//! reach the request handler, and tests can [`HistoryQueue::flush`] to wait
//! for the worker deterministically.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::retriever::Retriever;
use crate::types::NewChatHistory;

/// A chat-history job that could not be stored.
#[derive(Debug, Clone)]
pub struct HistoryFailure {
    pub contact_id: i64,
    pub error: String,
}

enum Command {
    Save(NewChatHistory),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Handle to the chat-history worker.
pub struct HistoryQueue {
    tx: mpsc::Sender<Command>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl HistoryQueue {
    /// Spawn the worker. Returns the queue and the receiving end of the
    /// failure channel.
    pub fn spawn(
        retriever: Arc<Retriever>,
        capacity: usize,
    ) -> (Self, mpsc::UnboundedReceiver<HistoryFailure>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(retriever, rx, failure_tx));
        (
            Self {
                tx,
                worker: Mutex::new(Some(worker)),
            },
            failure_rx,
        )
    }

    /// Queue an exchange without waiting. Returns `false` when the job was
    /// dropped because the queue is full or stopped.
    pub fn enqueue(&self, job: NewChatHistory) -> bool {
        let contact_id = job.contact_id;
        match self.tx.try_send(Command::Save(job)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(contact_id, "chat history queue full, dropping exchange");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(contact_id, "chat history queue stopped, dropping exchange");
                false
            }
        }
    }

    /// Wait until every job enqueued before this call has been processed.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Process what is queued, then stop the worker and wait for it.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown).await;
        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "chat history worker panicked");
        }
    }
}

async fn run_worker(
    retriever: Arc<Retriever>,
    mut rx: mpsc::Receiver<Command>,
    failures: mpsc::UnboundedSender<HistoryFailure>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Save(job) => {
                let contact_id = job.contact_id;
                match retriever.save_chat_history(&job).await {
                    Ok(entry) => debug!(contact_id, history_id = entry.id, "chat history saved"),
                    Err(e) => {
                        warn!(contact_id, error = %e, "failed to save chat history");
                        // Nobody listening is fine.
                        let _ = failures.send(HistoryFailure {
                            contact_id,
                            error: e.to_string(),
                        });
                    }
                }
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
            Command::Shutdown => break,
        }
    }
    rx.close();
    debug!("chat history worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::VectorStore;
    use async_trait::async_trait;
    use parley_config::model::RetrievalConfig;
    use parley_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
    use parley_core::{EmbeddingAdapter, ParleyError, PluginAdapter};
    use parley_storage::Database;
    use tempfile::tempdir;

    /// Two-dimensional embedder; fails whenever a text contains "fail".
    struct FlatEmbedder;

    #[async_trait]
    impl PluginAdapter for FlatEmbedder {
        fn name(&self) -> &str {
            "flat"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Embedding
        }
        async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), ParleyError> {
            Ok(())
        }
    }

    #[async_trait]
    impl EmbeddingAdapter for FlatEmbedder {
        fn dimensions(&self) -> usize {
            2
        }
        async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, ParleyError> {
            if input.texts.iter().any(|t| t.contains("fail")) {
                return Err(ParleyError::Internal("embedder down".into()));
            }
            Ok(EmbeddingOutput {
                embeddings: input.texts.iter().map(|_| vec![1.0, 0.0]).collect(),
                dimensions: 2,
            })
        }
    }

    async fn setup() -> (Arc<Retriever>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("history.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let retriever = Retriever::new(
            VectorStore::new(db, 2),
            Arc::new(FlatEmbedder),
            &RetrievalConfig::default(),
        );
        (Arc::new(retriever), dir)
    }

    fn job(contact_id: i64, message: &str) -> NewChatHistory {
        NewChatHistory {
            contact_id,
            message: message.into(),
            response: "ok".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn flush_waits_for_saved_jobs() {
        let (retriever, _dir) = setup().await;
        let (queue, _failures) = HistoryQueue::spawn(retriever.clone(), 8);

        assert!(queue.enqueue(job(1, "hello")));
        assert!(queue.enqueue(job(1, "again")));
        queue.flush().await;

        assert_eq!(retriever.store().count_chat_history(1).await.unwrap(), 2);
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn failures_go_to_failure_channel() {
        let (retriever, _dir) = setup().await;
        let (queue, mut failures) = HistoryQueue::spawn(retriever.clone(), 8);

        queue.enqueue(job(9, "please fail"));
        queue.flush().await;

        let failure = failures.try_recv().unwrap();
        assert_eq!(failure.contact_id, 9);
        assert!(failure.error.contains("embedder down"));
        assert_eq!(retriever.store().count_chat_history(9).await.unwrap(), 0);
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn enqueue_after_shutdown_is_rejected() {
        let (retriever, _dir) = setup().await;
        let (queue, _failures) = HistoryQueue::spawn(retriever, 1);
        queue.shutdown().await;
        assert!(!queue.enqueue(job(1, "late")));
        // Flushing a stopped queue returns immediately.
        queue.flush().await;
    }
}
