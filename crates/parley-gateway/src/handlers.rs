// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Health, metrics, conversation workflow, broadcast and platform handlers.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use parley_core::types::MessageStatus;
use parley_core::{Channel, ParleyError};
use parley_storage::queries::{broadcasts, platforms};
use parley_storage::{
    now_timestamp, BroadcastHistory, BroadcastTemplate, ChatStats, ConversationMessage,
    PlatformRow, PlatformUpsert,
};
use serde::{Deserialize, Serialize};

use crate::error::{ok, parse_json, ApiError, DataResponse};
use crate::server::GatewayState;

type ApiResult<T> = Result<Json<DataResponse<T>>, ApiError>;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /health
///
/// 200 when the database answers, 503 otherwise.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let healthy = state.db.ping().await.is_ok();
    let body = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}

/// GET /metrics
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

pub(crate) fn parse_channel(platform: &str) -> Result<Channel, ApiError> {
    Channel::from_slug(platform)
        .ok_or_else(|| ApiError(ParleyError::not_found("platform", platform)))
}

// --- Conversations ---

#[derive(Debug, Deserialize)]
pub struct ChatListQuery {
    #[serde(default)]
    pub status: Option<String>,
}

/// GET /api/chats?status=Unassigned
pub async fn list_chats(
    State(state): State<GatewayState>,
    Query(query): Query<ChatListQuery>,
) -> ApiResult<Vec<ConversationMessage>> {
    let status = match query.status.as_deref() {
        None => MessageStatus::Unassigned,
        Some(s) => s
            .parse::<MessageStatus>()
            .map_err(|_| ApiError::bad_request(format!("unknown status `{s}`")))?,
    };
    Ok(ok(state.log.list_by_status(status).await?))
}

pub async fn chat_stats(State(state): State<GatewayState>) -> ApiResult<ChatStats> {
    Ok(ok(state.log.stats().await?))
}

pub async fn get_chat(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> ApiResult<ConversationMessage> {
    Ok(ok(state.log.get(id).await?))
}

pub async fn contact_chats(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<ConversationMessage>> {
    Ok(ok(state.log.list_for_contact(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub assigned_to: String,
    pub assigned_agent: String,
}

pub async fn assign_chat(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<ConversationMessage> {
    let req: AssignRequest = parse_json(&body)?;
    Ok(ok(state.log.assign(id, &req.assigned_to, &req.assigned_agent).await?))
}

pub async fn resolve_chat(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> ApiResult<ConversationMessage> {
    Ok(ok(state.log.resolve(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct TakeOverRequest {
    pub agent_name: String,
}

pub async fn take_over_chat(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<ConversationMessage> {
    let req: TakeOverRequest = parse_json(&body)?;
    if req.agent_name.trim().is_empty() {
        return Err(ApiError::bad_request("agent_name must not be empty"));
    }
    Ok(ok(state.log.take_over(id, &req.agent_name).await?))
}

pub async fn back_to_ai(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> ApiResult<ConversationMessage> {
    Ok(ok(state.log.back_to_ai(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct LabelRequest {
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct LabelsResponse {
    pub labels: String,
}

pub async fn add_label(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<LabelsResponse> {
    let req: LabelRequest = parse_json(&body)?;
    let labels = state.log.add_label(id, &req.label).await?;
    Ok(ok(LabelsResponse { labels }))
}

// --- Broadcasts ---

#[derive(Debug, Deserialize)]
pub struct TemplateRequest {
    pub name: String,
    pub content: String,
    /// A platform name, or `All` / absent for every contact.
    #[serde(default)]
    pub channel: Option<String>,
}

pub async fn create_template(
    State(state): State<GatewayState>,
    body: Bytes,
) -> ApiResult<BroadcastTemplate> {
    let req: TemplateRequest = parse_json(&body)?;
    if req.content.trim().is_empty() {
        return Err(ApiError::bad_request("content must not be empty"));
    }
    let channel = match req.channel.as_deref() {
        None | Some("All") | Some("all") => None,
        Some(c) => Some(
            Channel::from_slug(c)
                .ok_or_else(|| ApiError::bad_request(format!("unknown channel `{c}`")))?,
        ),
    };
    let template =
        broadcasts::create_template(&state.db, &req.name, &req.content, channel, &now_timestamp())
            .await?;
    Ok(ok(template))
}

#[derive(Debug, Deserialize)]
pub struct SendBroadcastRequest {
    #[serde(default = "default_sent_by")]
    pub sent_by: String,
}

fn default_sent_by() -> String {
    "admin".to_string()
}

#[derive(Debug, Serialize)]
pub struct SendBroadcastResponse {
    pub history_id: i64,
}

/// POST /api/broadcasts/{template_id}/send
///
/// Returns as soon as the run is recorded; sending continues in the background.
pub async fn send_broadcast(
    State(state): State<GatewayState>,
    Path(template_id): Path<i64>,
    body: Bytes,
) -> ApiResult<SendBroadcastResponse> {
    let req: SendBroadcastRequest = if body.is_empty() {
        SendBroadcastRequest {
            sent_by: default_sent_by(),
        }
    } else {
        parse_json(&body)?
    };
    let (history_id, _task) = state
        .broadcaster
        .send_broadcast(template_id, &req.sent_by)
        .await?;
    Ok(ok(SendBroadcastResponse { history_id }))
}

pub async fn get_broadcast_history(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> ApiResult<BroadcastHistory> {
    let history = broadcasts::get_history(&state.db, id)
        .await?
        .ok_or_else(|| ParleyError::not_found("broadcast history", id))?;
    Ok(ok(history))
}

// --- Platforms ---

pub async fn list_platforms(State(state): State<GatewayState>) -> ApiResult<Vec<PlatformRow>> {
    Ok(ok(platforms::list_platforms(&state.db).await?))
}

pub async fn get_platform(
    State(state): State<GatewayState>,
    Path(platform): Path<String>,
) -> ApiResult<PlatformRow> {
    let channel = parse_channel(&platform)?;
    let row = platforms::get_platform(&state.db, channel)
        .await?
        .ok_or_else(|| ParleyError::not_found("platform", channel))?;
    Ok(ok(row))
}

#[derive(Debug, Deserialize)]
pub struct PlatformRequest {
    #[serde(default)]
    pub platform_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub phone_number_id: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

pub async fn upsert_platform(
    State(state): State<GatewayState>,
    Path(platform): Path<String>,
    body: Bytes,
) -> ApiResult<PlatformRow> {
    let channel = parse_channel(&platform)?;
    let req: PlatformRequest = parse_json(&body)?;
    let fields = PlatformUpsert {
        platform_id: req.platform_id,
        token: req.token,
        phone_number_id: req.phone_number_id,
        webhook_url: req.webhook_url,
        active: req.active,
    };
    let row = platforms::upsert_platform(&state.db, channel, &fields, &now_timestamp()).await?;
    Ok(ok(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_request_channel_is_optional() {
        let req: TemplateRequest =
            serde_json::from_str(r#"{"name":"promo","content":"Hi {name}"}"#).unwrap();
        assert!(req.channel.is_none());
    }

    #[test]
    fn platform_request_defaults_active() {
        let req: PlatformRequest = serde_json::from_str(r#"{"token":"t"}"#).unwrap();
        assert!(req.active);
        assert_eq!(req.token.as_deref(), Some("t"));
    }

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            uptime_secs: 42,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"uptime_secs\":42"));
    }

    #[test]
    fn unknown_platform_is_not_found() {
        let err = parse_channel("fax").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(parse_channel("whatsapp").unwrap(), Channel::WhatsApp);
    }
}
