// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record types for the four embedding collections and vector helpers.

use serde::{Deserialize, Serialize};

/// A knowledge base article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeEntry {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: String,
    pub source: String,
    pub active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewKnowledge {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub source: String,
}

/// A question/answer pair. `hit_count` grows each time it is the top match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaqEntry {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub hit_count: i64,
    pub active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewFaq {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub category: String,
}

/// Embedded product description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductEmbedding {
    pub id: i64,
    pub product_id: i64,
    pub description: String,
    pub features: String,
    pub use_cases: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProductEmbedding {
    pub product_id: i64,
    pub description: String,
    #[serde(default)]
    pub features: String,
    #[serde(default)]
    pub use_cases: String,
}

impl NewProductEmbedding {
    /// Text that gets embedded for this product.
    pub fn embedding_text(&self) -> String {
        format!("{}. {}. {}", self.description, self.features, self.use_cases)
    }
}

/// One answered exchange, embedded for similar-conversation lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatHistoryEntry {
    pub id: i64,
    pub contact_id: i64,
    pub message: String,
    pub response: String,
    pub sentiment: Option<String>,
    pub intent: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewChatHistory {
    pub contact_id: i64,
    pub message: String,
    pub response: String,
    pub sentiment: Option<String>,
    pub intent: Option<String>,
}

/// A search hit. Lower distance is closer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scored<T> {
    #[serde(flatten)]
    pub item: T,
    pub distance: f32,
}

/// Convert f32 vector to bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert SQLite BLOB back to f32 vector. Trailing partial chunks are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Cosine similarity; zero when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Cosine distance in `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Rank `rows` by cosine distance to `query`, closest first.
///
/// Rows whose vector length differs from the query are skipped. The sort is
/// stable, so equal distances keep the input order.
pub fn rank_by_distance<T>(rows: Vec<(T, Vec<f32>)>, query: &[f32], limit: usize) -> Vec<Scored<T>> {
    let mut scored: Vec<Scored<T>> = rows
        .into_iter()
        .filter(|(_, embedding)| embedding.len() == query.len())
        .map(|(item, embedding)| Scored {
            distance: cosine_distance(query, &embedding),
            item,
        })
        .collect();
    scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_roundtrip() {
        let original = vec![1.0f32, -2.5, 0.0, 3.25];
        let blob = vec_to_blob(&original);
        assert_eq!(blob.len(), 16);
        assert_eq!(blob_to_vec(&blob), original);
    }

    #[test]
    fn cosine_of_scaled_vectors_is_one() {
        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_and_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn rank_orders_and_truncates() {
        let rows = vec![
            ("far", vec![0.0, 1.0]),
            ("near", vec![1.0, 0.1]),
            ("exact", vec![2.0, 0.0]),
        ];
        let ranked = rank_by_distance(rows, &[1.0, 0.0], 2);
        let names: Vec<_> = ranked.iter().map(|s| s.item).collect();
        assert_eq!(names, vec!["exact", "near"]);
    }

    #[test]
    fn rank_ties_keep_insertion_order() {
        let rows = vec![("a", vec![1.0, 0.0]), ("b", vec![1.0, 0.0]), ("c", vec![1.0, 0.0])];
        let ranked = rank_by_distance(rows, &[1.0, 0.0], 3);
        let names: Vec<_> = ranked.iter().map(|s| s.item).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn rank_skips_dimension_mismatch() {
        let rows = vec![("short", vec![1.0]), ("ok", vec![1.0, 0.0])];
        let ranked = rank_by_distance(rows, &[1.0, 0.0], 5);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].item, "ok");
    }

    #[test]
    fn product_embedding_text_joins_fields() {
        let product = NewProductEmbedding {
            product_id: 1,
            description: "Solar lamp".into(),
            features: "USB charging".into(),
            use_cases: "camping".into(),
        };
        assert_eq!(product.embedding_text(), "Solar lamp. USB charging. camping");
    }
}
