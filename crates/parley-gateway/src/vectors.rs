// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge, FAQ, product and chat-history retrieval endpoints.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use parley_vector::{
    ChatHistoryEntry, FaqEntry, KnowledgeEntry, NewFaq, NewKnowledge, NewProductEmbedding,
    ProductEmbedding, Scored,
};
use serde::Deserialize;

use crate::error::{ok, parse_json, ApiError, DataResponse};
use crate::server::GatewayState;

type ApiResult<T> = Result<Json<DataResponse<T>>, ApiError>;

const DEFAULT_LIMIT: usize = 5;
const MAX_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchQuery {
    fn query(&self) -> Result<&str, ApiError> {
        match self.q.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => Ok(q),
            _ => Err(ApiError::bad_request("query parameter `q` is required")),
        }
    }

    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
pub struct ActiveRequest {
    pub active: bool,
}

pub async fn add_knowledge(
    State(state): State<GatewayState>,
    body: Bytes,
) -> ApiResult<KnowledgeEntry> {
    let entry: NewKnowledge = parse_json(&body)?;
    if entry.content.trim().is_empty() {
        return Err(ApiError::bad_request("content must not be empty"));
    }
    Ok(ok(state.retriever.add_knowledge(&entry).await?))
}

pub async fn list_knowledge(State(state): State<GatewayState>) -> ApiResult<Vec<KnowledgeEntry>> {
    Ok(ok(state.retriever.list_knowledge().await?))
}

pub async fn search_knowledge(
    State(state): State<GatewayState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<Scored<KnowledgeEntry>>> {
    let hits = state
        .retriever
        .search_knowledge(query.query()?, query.limit())
        .await?;
    Ok(ok(hits))
}

/// Case-insensitive substring search without embeddings.
pub async fn keyword_search(
    State(state): State<GatewayState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<KnowledgeEntry>> {
    let hits = state
        .retriever
        .keyword_search_knowledge(query.query()?, query.limit())
        .await?;
    Ok(ok(hits))
}

pub async fn set_knowledge_active(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<bool> {
    let req: ActiveRequest = parse_json(&body)?;
    state.retriever.set_knowledge_active(id, req.active).await?;
    Ok(ok(req.active))
}

pub async fn add_faq(State(state): State<GatewayState>, body: Bytes) -> ApiResult<FaqEntry> {
    let entry: NewFaq = parse_json(&body)?;
    if entry.question.trim().is_empty() || entry.answer.trim().is_empty() {
        return Err(ApiError::bad_request("question and answer must not be empty"));
    }
    Ok(ok(state.retriever.add_faq(&entry).await?))
}

pub async fn list_faq(State(state): State<GatewayState>) -> ApiResult<Vec<FaqEntry>> {
    Ok(ok(state.retriever.list_faq().await?))
}

/// Searching also counts a hit on the closest FAQ.
pub async fn search_faq(
    State(state): State<GatewayState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<Scored<FaqEntry>>> {
    let hits = state
        .retriever
        .search_faq(query.query()?, query.limit())
        .await?;
    Ok(ok(hits))
}

pub async fn set_faq_active(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<bool> {
    let req: ActiveRequest = parse_json(&body)?;
    state.retriever.set_faq_active(id, req.active).await?;
    Ok(ok(req.active))
}

pub async fn add_product_embedding(
    State(state): State<GatewayState>,
    body: Bytes,
) -> ApiResult<ProductEmbedding> {
    let entry: NewProductEmbedding = parse_json(&body)?;
    Ok(ok(state.retriever.add_product_embedding(&entry).await?))
}

pub async fn search_products(
    State(state): State<GatewayState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<Scored<ProductEmbedding>>> {
    let hits = state
        .retriever
        .search_products(query.query()?, query.limit())
        .await?;
    Ok(ok(hits))
}

pub async fn similar_conversations(
    State(state): State<GatewayState>,
    Path(contact_id): Path<i64>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<Scored<ChatHistoryEntry>>> {
    let hits = state
        .retriever
        .similar_conversations(contact_id, query.query()?, query.limit())
        .await?;
    Ok(ok(hits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped() {
        let q = SearchQuery {
            q: Some("x".into()),
            limit: Some(500),
        };
        assert_eq!(q.limit(), MAX_LIMIT);
        let q = SearchQuery { q: None, limit: None };
        assert_eq!(q.limit(), DEFAULT_LIMIT);
        assert!(q.query().is_err());
    }

    #[test]
    fn blank_query_is_rejected() {
        let q = SearchQuery {
            q: Some("   ".into()),
            limit: None,
        };
        assert_eq!(q.query().unwrap_err().status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
