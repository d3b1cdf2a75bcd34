// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley integration tests.
//!
//! Provides mock adapters and a test harness for fast, deterministic,
//! CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockEmbedder`] - Deterministic bag-of-words embedder
//! - [`MockResponder`] - Generative responder with queued replies
//! - [`RecordingSender`] - Platform sender that captures outbound messages
//! - [`TestHarness`] - Full webhook stack over a temp database

pub mod harness;
pub mod mock_embedder;
pub mod mock_responder;
pub mod recording_sender;

pub use harness::{TestHarness, TestHarnessBuilder, VERIFY_TOKEN};
pub use mock_embedder::MockEmbedder;
pub use mock_responder::MockResponder;
pub use recording_sender::RecordingSender;
