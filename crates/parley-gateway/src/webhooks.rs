// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform webhook endpoints: GET verification and POST delivery.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::handlers::parse_channel;
use crate::server::GatewayState;

/// Query parameters of a subscription handshake.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode", default)]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token", default)]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge", default)]
    pub challenge: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
}

/// GET /api/webhooks/{platform}
///
/// Echoes `hub.challenge` verbatim when the handshake is valid, 403 otherwise.
pub async fn verify(
    State(state): State<GatewayState>,
    Path(platform): Path<String>,
    Query(params): Query<VerifyParams>,
) -> Result<Response, ApiError> {
    let channel = parse_channel(&platform)?;
    let response = match state.dispatcher.verify(
        channel,
        params.mode.as_deref(),
        params.verify_token.as_deref(),
        params.challenge.as_deref(),
    ) {
        Some(challenge) => (StatusCode::OK, challenge).into_response(),
        None => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
    };
    Ok(response)
}

/// POST /api/webhooks/{platform}
///
/// 200 for processed and dropped deliveries, 400 for malformed bodies and
/// 500 when processing failed on a platform that reports failures.
pub async fn receive(
    State(state): State<GatewayState>,
    Path(platform): Path<String>,
    body: Bytes,
) -> Result<Json<AckResponse>, ApiError> {
    let channel = parse_channel(&platform)?;
    let outcome = state.dispatcher.dispatch(channel, &body).await?;
    debug!(channel = %channel, ?outcome, "webhook handled");
    Ok(Json(AckResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_params_use_hub_names() {
        let params: VerifyParams = serde_json::from_value(serde_json::json!({
            "hub.mode": "subscribe",
            "hub.verify_token": "tok",
            "hub.challenge": "123"
        }))
        .unwrap();
        assert_eq!(params.mode.as_deref(), Some("subscribe"));
        assert_eq!(params.verify_token.as_deref(), Some("tok"));
        assert_eq!(params.challenge.as_deref(), Some("123"));
    }
}
