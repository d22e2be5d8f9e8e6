//! Brute-force cosine similarity ranking over candidate chunks.
//!
//! Collections are small (tens of materials, a few hundred chunks), so an
//! exhaustive scan beats maintaining an approximate index. Scoring is
//! deterministic: equal similarities are broken by ascending chunk index so
//! repeated queries return the same order.

use tracing::warn;

use crate::storage::CollectionChunk;

/// A chunk that scored above the similarity threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub material_id: String,
    pub material_name: String,
    pub chunk_index: usize,
    pub text: String,
    pub similarity: f32,
}

/// Cosine similarity of two vectors. Returns 0.0 when either vector has zero
/// magnitude, which also covers empty inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// Score `candidates` against `query` and keep the best `top_k` at or above
/// `threshold`.
///
/// Candidates whose embedding dimension does not match the query (stale rows
/// from an earlier embedding model) are skipped with a warning rather than
/// failing the whole search.
pub fn rank(
    query: &[f32],
    candidates: Vec<CollectionChunk>,
    threshold: f32,
    top_k: usize,
) -> Vec<RetrievalResult> {
    let mut scored: Vec<RetrievalResult> = Vec::new();

    for candidate in candidates {
        let Some(embedding) = candidate.chunk.embedding.as_deref() else {
            continue;
        };
        if embedding.len() != query.len() {
            warn!(
                material_id = %candidate.chunk.material_id,
                chunk_index = candidate.chunk.metadata.chunk_index,
                expected = query.len(),
                actual = embedding.len(),
                "skipping chunk with mismatched embedding dimension"
            );
            continue;
        }

        let similarity = cosine_similarity(query, embedding);
        if similarity >= threshold {
            scored.push(RetrievalResult {
                material_id: candidate.chunk.material_id,
                material_name: candidate.material_name,
                chunk_index: candidate.chunk.metadata.chunk_index,
                text: candidate.chunk.text,
                similarity,
            });
        }
    }

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_index.cmp(&b.chunk_index))
    });
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ChunkMetadata, ChunkRecord, CollectionChunk, MaterialKind};

    fn candidate(material_id: &str, chunk_index: usize, embedding: Vec<f32>) -> CollectionChunk {
        CollectionChunk {
            chunk: ChunkRecord {
                id: None,
                material_id: material_id.to_string(),
                text: format!("{material_id} chunk {chunk_index}"),
                embedding: Some(embedding),
                metadata: ChunkMetadata {
                    chunk_index,
                    total_chunks: 1,
                    page: None,
                    section: None,
                },
            },
            material_name: material_id.to_string(),
            material_kind: MaterialKind::File,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        // Identical direction
        let similarity = cosine_similarity(&[1.0, 0.0, 0.0], &[2.0, 0.0, 0.0]);
        assert!((similarity - 1.0).abs() < 1e-6);

        // Orthogonal
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);

        // Opposite
        let similarity = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((similarity + 1.0).abs() < 1e-6);

        // Known angle
        let similarity = cosine_similarity(&[0.6, 0.8], &[0.8, 0.6]);
        assert!((similarity - 0.96).abs() < 1e-6);

        // Zero vector
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_rank_orders_by_similarity() {
        let query = vec![1.0, 0.0];
        let candidates = vec![
            candidate("low", 0, vec![0.5, (1.0f32 - 0.25).sqrt()]),
            candidate("high", 0, vec![1.0, 0.0]),
            candidate("mid", 0, vec![0.9, (1.0f32 - 0.81).sqrt()]),
        ];

        let results = rank(&query, candidates, 0.0, 10);
        let order: Vec<&str> = results.iter().map(|r| r.material_id.as_str()).collect();
        assert_eq!(order, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_rank_applies_threshold_and_top_k() {
        let query = vec![1.0, 0.0];
        let candidates = vec![
            candidate("a", 0, vec![1.0, 0.0]),
            candidate("b", 0, vec![0.8, 0.6]),
            candidate("c", 0, vec![0.0, 1.0]),
        ];

        let results = rank(&query, candidates.clone(), 0.7, 10);
        assert_eq!(results.len(), 2);

        let results = rank(&query, candidates, 0.7, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].material_id, "a");
    }

    #[test]
    fn test_rank_ties_break_by_chunk_index() {
        let query = vec![1.0, 0.0];
        let candidates = vec![
            candidate("m", 3, vec![1.0, 0.0]),
            candidate("m", 1, vec![1.0, 0.0]),
            candidate("m", 2, vec![1.0, 0.0]),
        ];

        let results = rank(&query, candidates, 0.0, 10);
        let order: Vec<usize> = results.iter().map(|r| r.chunk_index).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_rank_skips_mismatched_dimensions() {
        let query = vec![1.0, 0.0];
        let candidates = vec![
            candidate("stale", 0, vec![1.0, 0.0, 0.0]),
            candidate("ok", 0, vec![1.0, 0.0]),
        ];

        let results = rank(&query, candidates, 0.0, 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].material_id, "ok");
    }
}
