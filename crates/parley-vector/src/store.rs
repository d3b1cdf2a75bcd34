// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed vector store for the knowledge, FAQ, product and chat
//! history collections. Embeddings are stored as BLOBs and ranked in Rust.

use parley_core::ParleyError;
use parley_storage::database::map_tr_err;
use parley_storage::Database;
use rusqlite::{params, OptionalExtension};

use crate::types::{
    blob_to_vec, rank_by_distance, vec_to_blob, ChatHistoryEntry, FaqEntry, KnowledgeEntry,
    NewChatHistory, NewFaq, NewKnowledge, NewProductEmbedding, ProductEmbedding, Scored,
};

fn row_to_knowledge(row: &rusqlite::Row<'_>) -> rusqlite::Result<KnowledgeEntry> {
    Ok(KnowledgeEntry {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        category: row.get(3)?,
        tags: row.get(4)?,
        source: row.get(5)?,
        active: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn row_to_faq(row: &rusqlite::Row<'_>) -> rusqlite::Result<FaqEntry> {
    Ok(FaqEntry {
        id: row.get(0)?,
        question: row.get(1)?,
        answer: row.get(2)?,
        category: row.get(3)?,
        hit_count: row.get(4)?,
        active: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn row_to_product(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProductEmbedding> {
    Ok(ProductEmbedding {
        id: row.get(0)?,
        product_id: row.get(1)?,
        description: row.get(2)?,
        features: row.get(3)?,
        use_cases: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_history(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatHistoryEntry> {
    Ok(ChatHistoryEntry {
        id: row.get(0)?,
        contact_id: row.get(1)?,
        message: row.get(2)?,
        response: row.get(3)?,
        sentiment: row.get(4)?,
        intent: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const KNOWLEDGE_COLUMNS: &str = "id, title, content, category, tags, source, active, created_at";
const FAQ_COLUMNS: &str = "id, question, answer, category, hit_count, active, created_at";
const PRODUCT_COLUMNS: &str = "id, product_id, description, features, use_cases, created_at";
const HISTORY_COLUMNS: &str = "id, contact_id, message, response, sentiment, intent, created_at";

/// Persistent store for the embedding collections.
///
/// Every vector written must have exactly `dimensions` components.
#[derive(Clone)]
pub struct VectorStore {
    db: Database,
    dimensions: usize,
}

impl VectorStore {
    pub fn new(db: Database, dimensions: usize) -> Self {
        Self { db, dimensions }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn check_dimensions(&self, embedding: &[f32]) -> Result<(), ParleyError> {
        if embedding.len() != self.dimensions {
            return Err(ParleyError::InvalidPayload(format!(
                "embedding has {} dimensions, expected {}",
                embedding.len(),
                self.dimensions
            )));
        }
        Ok(())
    }

    // --- Knowledge base ---

    pub async fn insert_knowledge(
        &self,
        entry: &NewKnowledge,
        embedding: &[f32],
        now: &str,
    ) -> Result<KnowledgeEntry, ParleyError> {
        self.check_dimensions(embedding)?;
        let entry = entry.clone();
        let blob = vec_to_blob(embedding);
        let now = now.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO knowledge_base (title, content, category, tags, source, embedding, active, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
                    params![entry.title, entry.content, entry.category, entry.tags, entry.source, blob, now],
                )?;
                let id = conn.last_insert_rowid();
                conn.query_row(
                    &format!("SELECT {KNOWLEDGE_COLUMNS} FROM knowledge_base WHERE id = ?1"),
                    params![id],
                    row_to_knowledge,
                )
            })
            .await
            .map_err(map_tr_err)
    }

    /// Active knowledge entries closest to `query`.
    pub async fn nearest_knowledge(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<KnowledgeEntry>>, ParleyError> {
        let rows = self
            .db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {KNOWLEDGE_COLUMNS}, embedding FROM knowledge_base
                     WHERE active = 1 ORDER BY id ASC"
                ))?;
                let rows = stmt.query_map([], |row| {
                    let blob: Vec<u8> = row.get(8)?;
                    Ok((row_to_knowledge(row)?, blob_to_vec(&blob)))
                })?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)?;
        Ok(rank_by_distance(rows, query, limit))
    }

    /// All knowledge entries, newest first.
    pub async fn list_knowledge(&self) -> Result<Vec<KnowledgeEntry>, ParleyError> {
        self.db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {KNOWLEDGE_COLUMNS} FROM knowledge_base ORDER BY created_at DESC, id DESC"
                ))?;
                let rows = stmt.query_map([], row_to_knowledge)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Case-insensitive substring match over title and content, active only.
    pub async fn keyword_search_knowledge(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<KnowledgeEntry>, ParleyError> {
        let term = term.to_lowercase();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {KNOWLEDGE_COLUMNS} FROM knowledge_base
                     WHERE active = 1
                       AND (instr(lower(title), ?1) > 0 OR instr(lower(content), ?1) > 0)
                     ORDER BY created_at DESC, id DESC LIMIT ?2"
                ))?;
                let rows = stmt.query_map(params![term, limit], row_to_knowledge)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Returns `false` when the id does not exist.
    pub async fn set_knowledge_active(&self, id: i64, active: bool) -> Result<bool, ParleyError> {
        let changed = self
            .db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE knowledge_base SET active = ?2 WHERE id = ?1",
                    params![id, active],
                )
            })
            .await
            .map_err(map_tr_err)?;
        Ok(changed > 0)
    }

    // --- FAQ ---

    pub async fn insert_faq(
        &self,
        entry: &NewFaq,
        embedding: &[f32],
        now: &str,
    ) -> Result<FaqEntry, ParleyError> {
        self.check_dimensions(embedding)?;
        let entry = entry.clone();
        let blob = vec_to_blob(embedding);
        let now = now.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO faq_entries (question, answer, category, embedding, hit_count, active, created_at)
                     VALUES (?1, ?2, ?3, ?4, 0, 1, ?5)",
                    params![entry.question, entry.answer, entry.category, blob, now],
                )?;
                let id = conn.last_insert_rowid();
                conn.query_row(
                    &format!("SELECT {FAQ_COLUMNS} FROM faq_entries WHERE id = ?1"),
                    params![id],
                    row_to_faq,
                )
            })
            .await
            .map_err(map_tr_err)
    }

    /// Active FAQ entries closest to `query`.
    pub async fn nearest_faq(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<FaqEntry>>, ParleyError> {
        let rows = self
            .db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {FAQ_COLUMNS}, embedding FROM faq_entries
                     WHERE active = 1 ORDER BY id ASC"
                ))?;
                let rows = stmt.query_map([], |row| {
                    let blob: Vec<u8> = row.get(7)?;
                    Ok((row_to_faq(row)?, blob_to_vec(&blob)))
                })?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)?;
        Ok(rank_by_distance(rows, query, limit))
    }

    pub async fn increment_faq_hit(&self, id: i64) -> Result<(), ParleyError> {
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE faq_entries SET hit_count = hit_count + 1 WHERE id = ?1",
                    params![id],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn get_faq(&self, id: i64) -> Result<Option<FaqEntry>, ParleyError> {
        self.db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    &format!("SELECT {FAQ_COLUMNS} FROM faq_entries WHERE id = ?1"),
                    params![id],
                    row_to_faq,
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    /// All FAQ entries, most hit first.
    pub async fn list_faq(&self) -> Result<Vec<FaqEntry>, ParleyError> {
        self.db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {FAQ_COLUMNS} FROM faq_entries ORDER BY hit_count DESC, id ASC"
                ))?;
                let rows = stmt.query_map([], row_to_faq)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Returns `false` when the id does not exist.
    pub async fn set_faq_active(&self, id: i64, active: bool) -> Result<bool, ParleyError> {
        let changed = self
            .db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE faq_entries SET active = ?2 WHERE id = ?1",
                    params![id, active],
                )
            })
            .await
            .map_err(map_tr_err)?;
        Ok(changed > 0)
    }

    // --- Products ---

    pub async fn insert_product_embedding(
        &self,
        entry: &NewProductEmbedding,
        embedding: &[f32],
        now: &str,
    ) -> Result<ProductEmbedding, ParleyError> {
        self.check_dimensions(embedding)?;
        let entry = entry.clone();
        let blob = vec_to_blob(embedding);
        let now = now.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO product_embeddings (product_id, description, features, use_cases, embedding, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![entry.product_id, entry.description, entry.features, entry.use_cases, blob, now],
                )?;
                let id = conn.last_insert_rowid();
                conn.query_row(
                    &format!("SELECT {PRODUCT_COLUMNS} FROM product_embeddings WHERE id = ?1"),
                    params![id],
                    row_to_product,
                )
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn nearest_products(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<ProductEmbedding>>, ParleyError> {
        let rows = self
            .db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PRODUCT_COLUMNS}, embedding FROM product_embeddings ORDER BY id ASC"
                ))?;
                let rows = stmt.query_map([], |row| {
                    let blob: Vec<u8> = row.get(6)?;
                    Ok((row_to_product(row)?, blob_to_vec(&blob)))
                })?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)?;
        Ok(rank_by_distance(rows, query, limit))
    }

    // --- Chat history ---

    pub async fn insert_chat_history(
        &self,
        entry: &NewChatHistory,
        message_embedding: &[f32],
        response_embedding: &[f32],
        now: &str,
    ) -> Result<ChatHistoryEntry, ParleyError> {
        self.check_dimensions(message_embedding)?;
        self.check_dimensions(response_embedding)?;
        let entry = entry.clone();
        let message_blob = vec_to_blob(message_embedding);
        let response_blob = vec_to_blob(response_embedding);
        let now = now.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO chat_history (contact_id, message, response, message_embedding,
                         response_embedding, sentiment, intent, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        entry.contact_id,
                        entry.message,
                        entry.response,
                        message_blob,
                        response_blob,
                        entry.sentiment,
                        entry.intent,
                        now
                    ],
                )?;
                let id = conn.last_insert_rowid();
                conn.query_row(
                    &format!("SELECT {HISTORY_COLUMNS} FROM chat_history WHERE id = ?1"),
                    params![id],
                    row_to_history,
                )
            })
            .await
            .map_err(map_tr_err)
    }

    /// A contact's past exchanges whose inbound message is closest to `query`.
    pub async fn nearest_chat_history(
        &self,
        contact_id: i64,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<Scored<ChatHistoryEntry>>, ParleyError> {
        let rows = self
            .db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {HISTORY_COLUMNS}, message_embedding FROM chat_history
                     WHERE contact_id = ?1 ORDER BY id ASC"
                ))?;
                let rows = stmt.query_map(params![contact_id], |row| {
                    let blob: Vec<u8> = row.get(7)?;
                    Ok((row_to_history(row)?, blob_to_vec(&blob)))
                })?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)?;
        Ok(rank_by_distance(rows, query, limit))
    }

    pub async fn count_chat_history(&self, contact_id: i64) -> Result<i64, ParleyError> {
        self.db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM chat_history WHERE contact_id = ?1",
                    params![contact_id],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(map_tr_err)
    }
}
