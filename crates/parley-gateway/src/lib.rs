// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Parley conversation service.
//!
//! Serves the platform webhooks, the conversation workflow API, retrieval
//! management, broadcasts, and unauthenticated `/health` and `/metrics`.
//! Errors are returned as `{"success": false, "error": "..."}`.

pub mod error;
pub mod handlers;
pub mod server;
pub mod vectors;
pub mod webhooks;

pub use error::{ApiError, DataResponse, ErrorResponse};
pub use server::{build_router, start_server, GatewayState, HealthState};
