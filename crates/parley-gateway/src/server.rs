// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use parley_agent::{Broadcaster, ConversationLog, WebhookDispatcher};
use parley_config::model::ServerConfig;
use parley_core::ParleyError;
use parley_storage::Database;
use parley_vector::Retriever;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{handlers, vectors, webhooks};

/// State for the unauthenticated health and metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Instant,
    /// Renders the Prometheus exposition; `None` disables `/metrics`.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl HealthState {
    pub fn new(prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>) -> Self {
        Self {
            start_time: Instant::now(),
            prometheus_render,
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub dispatcher: Arc<WebhookDispatcher>,
    pub log: Arc<ConversationLog>,
    pub retriever: Arc<Retriever>,
    pub broadcaster: Arc<Broadcaster>,
    pub db: Database,
    pub health: HealthState,
}

/// All gateway routes with CORS and request tracing applied.
pub fn build_router(state: GatewayState) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics));

    let webhook_routes = Router::new().route(
        "/api/webhooks/{platform}",
        get(webhooks::verify).post(webhooks::receive),
    );

    let chat_routes = Router::new()
        .route("/api/chats", get(handlers::list_chats))
        .route("/api/chats/stats", get(handlers::chat_stats))
        .route("/api/chats/{id}", get(handlers::get_chat))
        .route("/api/chats/{id}/assign", post(handlers::assign_chat))
        .route("/api/chats/{id}/resolve", post(handlers::resolve_chat))
        .route("/api/chats/{id}/takeover", post(handlers::take_over_chat))
        .route("/api/chats/{id}/back-to-ai", post(handlers::back_to_ai))
        .route("/api/chats/{id}/labels", post(handlers::add_label))
        .route("/api/contacts/{id}/chats", get(handlers::contact_chats));

    let vector_routes = Router::new()
        .route(
            "/api/vectors/knowledge",
            get(vectors::list_knowledge).post(vectors::add_knowledge),
        )
        .route("/api/vectors/knowledge/search", get(vectors::search_knowledge))
        .route("/api/vectors/knowledge/keyword", get(vectors::keyword_search))
        .route(
            "/api/vectors/knowledge/{id}/active",
            post(vectors::set_knowledge_active),
        )
        .route("/api/vectors/faq", get(vectors::list_faq).post(vectors::add_faq))
        .route("/api/vectors/faq/search", get(vectors::search_faq))
        .route("/api/vectors/faq/{id}/active", post(vectors::set_faq_active))
        .route(
            "/api/vectors/products/embedding",
            post(vectors::add_product_embedding),
        )
        .route("/api/vectors/products/search", get(vectors::search_products))
        .route(
            "/api/vectors/chat-history/{contact_id}",
            get(vectors::similar_conversations),
        );

    let admin_routes = Router::new()
        .route("/api/broadcasts/templates", post(handlers::create_template))
        .route("/api/broadcasts/{template_id}/send", post(handlers::send_broadcast))
        .route("/api/broadcasts/history/{id}", get(handlers::get_broadcast_history))
        .route("/api/platforms", get(handlers::list_platforms))
        .route(
            "/api/platforms/{platform}",
            get(handlers::get_platform).put(handlers::upsert_platform),
        );

    Router::new()
        .merge(public)
        .merge(webhook_routes)
        .merge(chat_routes)
        .merge(vector_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), ParleyError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        ParleyError::Config(format!("failed to bind gateway to {addr}: {e}"))
    })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ParleyError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
