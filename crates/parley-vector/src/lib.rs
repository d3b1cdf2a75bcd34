// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding collections and retrieval-augmented context for Parley.
//!
//! Four collections (knowledge base, FAQ, product descriptions, chat history)
//! are stored as f32 BLOBs in SQLite and ranked by cosine distance. The
//! [`Retriever`] turns a user question into a context block for the
//! generative responder, and [`HistoryQueue`] stores answered exchanges in the
//! background.

pub mod embedder;
pub mod history;
pub mod retriever;
pub mod store;
pub mod types;

pub use embedder::OpenAiEmbedder;
pub use history::{HistoryFailure, HistoryQueue};
pub use retriever::{format_context, Retriever};
pub use store::VectorStore;
pub use types::{
    ChatHistoryEntry, FaqEntry, KnowledgeEntry, NewChatHistory, NewFaq, NewKnowledge,
    NewProductEmbedding, ProductEmbedding, Scored,
};
