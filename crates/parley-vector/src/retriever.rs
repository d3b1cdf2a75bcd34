// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval service: builds the knowledge/FAQ context block for a query and
//! handles ingestion and search for every embedding collection.

use std::sync::Arc;
use std::time::Instant;

use parley_config::model::RetrievalConfig;
use parley_core::types::EmbeddingInput;
use parley_core::{EmbeddingAdapter, ParleyError};
use parley_storage::now_timestamp;
use tracing::{debug, warn};

use crate::store::VectorStore;
use crate::types::{
    ChatHistoryEntry, FaqEntry, KnowledgeEntry, NewChatHistory, NewFaq, NewKnowledge,
    NewProductEmbedding, ProductEmbedding, Scored,
};

/// Orchestrates embedding generation and vector search.
pub struct Retriever {
    store: VectorStore,
    embedder: Arc<dyn EmbeddingAdapter>,
    knowledge_limit: usize,
    faq_limit: usize,
}

impl Retriever {
    pub fn new(
        store: VectorStore,
        embedder: Arc<dyn EmbeddingAdapter>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            knowledge_limit: config.knowledge_limit,
            faq_limit: config.faq_limit,
        }
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Embed a batch of texts, returning one vector per text.
    async fn embed_many(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, ParleyError> {
        let expected = texts.len();
        let output = self.embedder.embed(EmbeddingInput { texts }).await?;
        if output.embeddings.len() != expected {
            return Err(ParleyError::Internal(format!(
                "embedder returned {} vectors for {expected} texts",
                output.embeddings.len()
            )));
        }
        Ok(output.embeddings)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ParleyError> {
        self.embed_many(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ParleyError::Internal("embedding returned no results".to_string()))
    }

    /// Build the context block for `query`.
    ///
    /// Never fails: embedding or search errors are logged and the affected
    /// section is left out. An empty string means nothing relevant was found.
    pub async fn build_context(&self, query: &str) -> String {
        let started = Instant::now();
        let context = self.build_context_inner(query).await;
        parley_prometheus::record_retrieval_latency(started.elapsed().as_secs_f64());
        context
    }

    async fn build_context_inner(&self, query: &str) -> String {
        let embedding = match self.embed_one(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "query embedding failed, continuing without context");
                return String::new();
            }
        };

        let knowledge = match self
            .store
            .nearest_knowledge(&embedding, self.knowledge_limit)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "knowledge search failed");
                Vec::new()
            }
        };

        let faq = match self.store.nearest_faq(&embedding, self.faq_limit).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "faq search failed");
                Vec::new()
            }
        };
        if let Some(top) = faq.first()
            && let Err(e) = self.store.increment_faq_hit(top.item.id).await
        {
            warn!(faq_id = top.item.id, error = %e, "failed to count faq hit");
        }

        debug!(
            knowledge = knowledge.len(),
            faq = faq.len(),
            "retrieval context assembled"
        );
        format_context(&knowledge, &faq)
    }

    // --- Ingestion ---

    /// Embed `content` and store the article.
    pub async fn add_knowledge(&self, entry: &NewKnowledge) -> Result<KnowledgeEntry, ParleyError> {
        let embedding = self.embed_one(&entry.content).await?;
        self.store
            .insert_knowledge(entry, &embedding, &now_timestamp())
            .await
    }

    /// Embed `question` and store the pair.
    pub async fn add_faq(&self, entry: &NewFaq) -> Result<FaqEntry, ParleyError> {
        let embedding = self.embed_one(&entry.question).await?;
        self.store.insert_faq(entry, &embedding, &now_timestamp()).await
    }

    pub async fn add_product_embedding(
        &self,
        entry: &NewProductEmbedding,
    ) -> Result<ProductEmbedding, ParleyError> {
        let embedding = self.embed_one(&entry.embedding_text()).await?;
        self.store
            .insert_product_embedding(entry, &embedding, &now_timestamp())
            .await
    }

    /// Embed both sides of an exchange in one call and store it.
    pub async fn save_chat_history(
        &self,
        entry: &NewChatHistory,
    ) -> Result<ChatHistoryEntry, ParleyError> {
        let mut vectors = self
            .embed_many(vec![entry.message.clone(), entry.response.clone()])
            .await?
            .into_iter();
        let (Some(message_vec), Some(response_vec)) = (vectors.next(), vectors.next()) else {
            return Err(ParleyError::Internal("missing chat history embeddings".into()));
        };
        self.store
            .insert_chat_history(entry, &message_vec, &response_vec, &now_timestamp())
            .await
    }

    // --- Search ---

    pub async fn search_knowledge(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Scored<KnowledgeEntry>>, ParleyError> {
        let embedding = self.embed_one(query).await?;
        self.store.nearest_knowledge(&embedding, limit).await
    }

    /// FAQ search; the closest match has its hit count incremented.
    pub async fn search_faq(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Scored<FaqEntry>>, ParleyError> {
        let embedding = self.embed_one(query).await?;
        let mut hits = self.store.nearest_faq(&embedding, limit).await?;
        if let Some(top) = hits.first_mut() {
            self.store.increment_faq_hit(top.item.id).await?;
            top.item.hit_count += 1;
        }
        Ok(hits)
    }

    pub async fn search_products(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Scored<ProductEmbedding>>, ParleyError> {
        let embedding = self.embed_one(query).await?;
        self.store.nearest_products(&embedding, limit).await
    }

    pub async fn similar_conversations(
        &self,
        contact_id: i64,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Scored<ChatHistoryEntry>>, ParleyError> {
        let embedding = self.embed_one(query).await?;
        self.store
            .nearest_chat_history(contact_id, &embedding, limit)
            .await
    }

    pub async fn keyword_search_knowledge(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<KnowledgeEntry>, ParleyError> {
        self.store.keyword_search_knowledge(term, limit).await
    }

    pub async fn list_knowledge(&self) -> Result<Vec<KnowledgeEntry>, ParleyError> {
        self.store.list_knowledge().await
    }

    pub async fn list_faq(&self) -> Result<Vec<FaqEntry>, ParleyError> {
        self.store.list_faq().await
    }

    pub async fn set_knowledge_active(&self, id: i64, active: bool) -> Result<(), ParleyError> {
        if !self.store.set_knowledge_active(id, active).await? {
            return Err(ParleyError::not_found("knowledge entry", id));
        }
        Ok(())
    }

    pub async fn set_faq_active(&self, id: i64, active: bool) -> Result<(), ParleyError> {
        if !self.store.set_faq_active(id, active).await? {
            return Err(ParleyError::not_found("faq entry", id));
        }
        Ok(())
    }
}

/// Render knowledge and FAQ hits as the prompt context block.
pub fn format_context(
    knowledge: &[Scored<KnowledgeEntry>],
    faq: &[Scored<FaqEntry>],
) -> String {
    let mut context = String::new();
    if !knowledge.is_empty() {
        context.push_str("\n=== KNOWLEDGE BASE ===\n");
        for (i, hit) in knowledge.iter().enumerate() {
            context.push_str(&format!(
                "{}. {}\n{}\n\n",
                i + 1,
                hit.item.title,
                hit.item.content
            ));
        }
    }
    if !faq.is_empty() {
        context.push_str("\n=== FAQ ===\n");
        for hit in faq {
            context.push_str(&format!("Q: {}\nA: {}\n\n", hit.item.question, hit.item.answer));
        }
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_core::types::{AdapterType, EmbeddingOutput, HealthStatus};
    use parley_core::PluginAdapter;
    use parley_storage::Database;
    use tempfile::tempdir;

    /// Maps texts onto three axes by keyword; fails on "boom".
    struct AxisEmbedder;

    fn axis(text: &str) -> Vec<f32> {
        let t = text.to_lowercase();
        vec![
            if t.contains("price") { 1.0 } else { 0.0 },
            if t.contains("ship") { 1.0 } else { 0.0 },
            if t.contains("return") { 1.0 } else { 0.0 },
        ]
    }

    #[async_trait]
    impl PluginAdapter for AxisEmbedder {
        fn name(&self) -> &str {
            "axis"
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
    impl EmbeddingAdapter for AxisEmbedder {
        fn dimensions(&self) -> usize {
            3
        }
        async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, ParleyError> {
            if input.texts.iter().any(|t| t.contains("boom")) {
                return Err(ParleyError::upstream_status("embedding API", 500, "boom"));
            }
            Ok(EmbeddingOutput {
                embeddings: input.texts.iter().map(|t| axis(t)).collect(),
                dimensions: 3,
            })
        }
    }

    async fn setup() -> (Retriever, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("rag.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let retriever = Retriever::new(
            VectorStore::new(db, 3),
            Arc::new(AxisEmbedder),
            &RetrievalConfig::default(),
        );
        (retriever, dir)
    }

    #[tokio::test]
    async fn empty_collections_give_empty_context() {
        let (retriever, _dir) = setup().await;
        assert_eq!(retriever.build_context("what is the price?").await, "");
    }

    #[tokio::test]
    async fn embedding_failure_gives_empty_context() {
        let (retriever, _dir) = setup().await;
        retriever
            .add_knowledge(&NewKnowledge {
                title: "Pricing".into(),
                content: "price list".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(retriever.build_context("boom").await, "");
    }

    #[tokio::test]
    async fn context_lists_knowledge_then_faq() {
        let (retriever, _dir) = setup().await;
        retriever
            .add_knowledge(&NewKnowledge {
                title: "Pricing".into(),
                content: "Product X price is 10 USD".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        retriever
            .add_faq(&NewFaq {
                question: "What is the price?".into(),
                answer: "See the price list".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let context = retriever.build_context("price for product X?").await;
        assert_eq!(
            context,
            "\n=== KNOWLEDGE BASE ===\n1. Pricing\nProduct X price is 10 USD\n\n\
             \n=== FAQ ===\nQ: What is the price?\nA: See the price list\n\n"
        );
    }

    #[tokio::test]
    async fn faq_hit_counts_only_top_match() {
        let (retriever, _dir) = setup().await;
        let price = retriever
            .add_faq(&NewFaq {
                question: "price?".into(),
                answer: "10".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let shipping = retriever
            .add_faq(&NewFaq {
                question: "shipping?".into(),
                answer: "2 days".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        for _ in 0..3 {
            retriever.build_context("price please").await;
        }

        let store = retriever.store();
        assert_eq!(store.get_faq(price.id).await.unwrap().unwrap().hit_count, 3);
        assert_eq!(store.get_faq(shipping.id).await.unwrap().unwrap().hit_count, 0);
    }

    #[tokio::test]
    async fn search_faq_reports_incremented_count() {
        let (retriever, _dir) = setup().await;
        retriever
            .add_faq(&NewFaq {
                question: "returns?".into(),
                answer: "30 days".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let hits = retriever.search_faq("return policy", 2).await.unwrap();
        assert_eq!(hits[0].item.hit_count, 1);
        assert_eq!(retriever.list_faq().await.unwrap()[0].hit_count, 1);
    }

    #[tokio::test]
    async fn chat_history_round_trip() {
        let (retriever, _dir) = setup().await;
        retriever
            .save_chat_history(&NewChatHistory {
                contact_id: 5,
                message: "shipping time?".into(),
                response: "two days".into(),
                sentiment: Some("neutral".into()),
                intent: Some("shipping".into()),
            })
            .await
            .unwrap();
        let hits = retriever.similar_conversations(5, "ship", 3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.intent.as_deref(), Some("shipping"));
        assert!(retriever.similar_conversations(6, "ship", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggling_missing_entry_is_not_found() {
        let (retriever, _dir) = setup().await;
        assert!(retriever.set_knowledge_active(1, false).await.unwrap_err().is_not_found());
        assert!(retriever.set_faq_active(1, true).await.unwrap_err().is_not_found());
    }

    #[test]
    fn format_context_empty() {
        assert_eq!(format_context(&[], &[]), "");
    }
}
