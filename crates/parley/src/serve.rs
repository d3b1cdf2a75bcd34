// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley serve` and `parley migrate` implementations.
//!
//! Opens SQLite storage, builds the platform senders, embedder and
//! responder, assembles the conversation pipeline and serves the HTTP
//! gateway until SIGINT/SIGTERM. On the way out the chat-history queue is
//! drained, every adapter shut down and the WAL checkpointed.

use std::sync::Arc;
use std::time::Duration;

use parley_agent::shutdown::install_signal_handler;
use parley_agent::{
    Broadcaster, ContactResolver, ConversationLog, ConversationPipeline, SenderSet,
    WebhookDispatcher,
};
use parley_config::model::{CredentialSourceKind, ParleyConfig, ServerConfig};
use parley_core::{
    CredentialSource, EmbeddingAdapter, ParleyError, PluginAdapter, ProviderAdapter,
    StaticCredentials, StorageAdapter,
};
use parley_gateway::{GatewayState, HealthState};
use parley_instagram::InstagramSender;
use parley_openai::OpenAiResponder;
use parley_storage::SqliteStorage;
use parley_telegram::TelegramSender;
use parley_vector::{HistoryQueue, OpenAiEmbedder, Retriever, VectorStore};
use parley_whatsapp::WhatsAppSender;
use tracing::{error, info, warn};

pub async fn run_serve(config: ParleyConfig) -> Result<(), ParleyError> {
    init_tracing(&config.server);
    info!("starting parley serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    let db = storage.database()?.clone();

    let credentials: Arc<dyn CredentialSource> = match config.platforms.source {
        CredentialSourceKind::Config => {
            Arc::new(StaticCredentials::new(config.platform_credentials()))
        }
        CredentialSourceKind::Database => storage.clone(),
    };
    let senders = build_senders(&config, credentials)?;
    for channel in parley_core::Channel::ALL {
        if let Some(sender) = senders.get(channel) {
            match sender.health_check().await {
                Ok(status) => info!(
                    channel = %channel,
                    adapter = sender.name(),
                    version = %sender.version(),
                    kind = %sender.adapter_type(),
                    status = ?status,
                    "sender ready"
                ),
                Err(e) => warn!(channel = %channel, error = %e, "sender health check failed"),
            }
        }
    }

    if config.generation.api_key.is_none() {
        warn!("generation.api_key is not set, completions will be sent unauthenticated");
    }
    let embedding_key = config
        .embedding
        .api_key
        .as_deref()
        .or(config.generation.api_key.as_deref());
    let embedder: Arc<dyn EmbeddingAdapter> =
        Arc::new(OpenAiEmbedder::new(&config.embedding, embedding_key)?);
    let responder: Arc<dyn ProviderAdapter> = Arc::new(OpenAiResponder::new(&config.generation)?);

    let retriever = Arc::new(Retriever::new(
        VectorStore::new(db.clone(), config.embedding.dimensions),
        embedder.clone(),
        &config.retrieval,
    ));
    let (history, mut failures) =
        HistoryQueue::spawn(retriever.clone(), config.retrieval.history_queue_capacity);
    let history = Arc::new(history);
    tokio::spawn(async move {
        while let Some(failure) = failures.recv().await {
            error!(
                contact_id = failure.contact_id,
                error = %failure.error,
                "chat history not stored"
            );
        }
    });

    let prometheus = if config.metrics.enabled {
        match parley_prometheus::PrometheusAdapter::new() {
            Ok(adapter) => {
                info!("prometheus metrics enabled");
                Some(adapter)
            }
            Err(e) => {
                warn!(error = %e, "prometheus initialization failed, continuing without metrics");
                None
            }
        }
    } else {
        None
    };
    let render: Option<Arc<dyn Fn() -> String + Send + Sync>> = prometheus
        .map(|adapter| Arc::new(move || adapter.render()) as Arc<dyn Fn() -> String + Send + Sync>);

    let log = Arc::new(ConversationLog::new(db.clone(), &config.pipeline));
    let pipeline = Arc::new(ConversationPipeline::new(
        ContactResolver::new(db.clone(), &config.contacts),
        log.clone(),
        retriever.clone(),
        responder.clone(),
        senders.clone(),
        history.clone(),
        &config.pipeline,
    ));
    let dispatcher = Arc::new(WebhookDispatcher::new(pipeline, &config));
    let broadcaster = Arc::new(Broadcaster::new(
        db.clone(),
        senders.clone(),
        Duration::from_millis(config.broadcast.delay_ms),
    ));

    let state = GatewayState {
        dispatcher,
        log,
        retriever,
        broadcaster,
        db,
        health: HealthState::new(render),
    };

    let cancel = install_signal_handler();
    let served = parley_gateway::start_server(&config.server, state, cancel).await;

    info!("draining chat history queue");
    history.shutdown().await;
    senders.shutdown().await;
    for (adapter, result) in [
        (embedder.name().to_string(), embedder.shutdown().await),
        (responder.name().to_string(), responder.shutdown().await),
    ] {
        if let Err(e) = result {
            warn!(adapter = %adapter, error = %e, "adapter shutdown failed");
        }
    }
    if let Err(e) = storage.close().await {
        warn!(error = %e, "storage close failed");
    }
    info!("parley stopped");
    served
}

/// Open the database (which applies pending migrations) and exit.
pub async fn run_migrate(config: &ParleyConfig) -> Result<(), ParleyError> {
    init_tracing(&config.server);
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    storage.close().await?;
    println!(
        "parley: database at {} is up to date",
        config.storage.database_path
    );
    Ok(())
}

fn build_senders(
    config: &ParleyConfig,
    credentials: Arc<dyn CredentialSource>,
) -> Result<SenderSet, ParleyError> {
    Ok(SenderSet::new()
        .with(Arc::new(WhatsAppSender::new(
            &config.whatsapp,
            credentials.clone(),
        )?))
        .with(Arc::new(InstagramSender::new(
            &config.instagram,
            credentials.clone(),
        )?))
        .with(Arc::new(TelegramSender::new(&config.telegram, credentials)?)))
}

fn init_tracing(server: &ServerConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={},warn", server.log_level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false);

    // Ignore an already installed subscriber.
    let _ = if server.log_format == "json" {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
}
