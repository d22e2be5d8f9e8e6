//! Semantic search over a collection's materials.
//!
//! [`Retriever`] embeds a query, scans the collection's stored chunk
//! embeddings, and returns the best matches. [`Retriever::context_for_message`]
//! layers the retrieval trigger on top: chit-chat skips the provider call
//! entirely, and only material-seeking messages produce grounding context.

use std::sync::Arc;
use tracing::debug;

use mnemo_context::{
    MaterialListing, Passage, format_grounding_context, format_materials_summary, should_retrieve,
};
use mnemo_embed::{EmbedError, EmbeddingProvider};

use crate::similarity::{RetrievalResult, rank};
use crate::storage::{CandidateFilter, MaterialIndex};

/// Default number of results returned by a search.
pub const DEFAULT_TOP_K: usize = 3;

/// Default minimum cosine similarity for a result.
pub const DEFAULT_THRESHOLD: f32 = 0.7;

/// Errors from a similarity search.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("failed to embed query")]
    Embedding(#[from] EmbedError),

    #[error("failed to load candidate chunks")]
    Storage(#[source] anyhow::Error),
}

/// Options for a similarity search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub top_k: usize,
    pub threshold: f32,
    pub filter: CandidateFilter,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_THRESHOLD,
            filter: CandidateFilter::default(),
        }
    }
}

impl SearchOptions {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_filter(mut self, filter: CandidateFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Searches a collection's embedded chunks by semantic similarity.
pub struct Retriever {
    index: MaterialIndex,
    provider: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(index: MaterialIndex, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, provider }
    }

    /// Find the chunks in `collection_id` most similar to `query`.
    ///
    /// An empty candidate set short-circuits before the query is embedded,
    /// so collections with no processed materials never cost a provider call.
    pub async fn search(
        &self,
        collection_id: &str,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let candidates = self
            .index
            .collection_candidates(collection_id, &options.filter)
            .await
            .map_err(RetrievalError::Storage)?;

        if candidates.is_empty() {
            debug!(collection_id, "no candidate chunks, skipping query embedding");
            return Ok(Vec::new());
        }

        let query_embedding = self.provider.embed_text(query).await?;
        let results = rank(
            &query_embedding,
            candidates,
            options.threshold,
            options.top_k,
        );
        debug!(
            collection_id,
            results = results.len(),
            top_k = options.top_k,
            threshold = options.threshold,
            "similarity search complete"
        );
        Ok(results)
    }

    /// Build grounding context for a chat message, or `None` when the message
    /// does not ask about course materials or nothing relevant is stored.
    pub async fn context_for_message(
        &self,
        collection_id: &str,
        message: &str,
        options: &SearchOptions,
    ) -> Result<Option<String>, RetrievalError> {
        if !should_retrieve(message) {
            debug!(collection_id, "message does not reference materials");
            return Ok(None);
        }

        let results = self.search(collection_id, message, options).await?;
        if results.is_empty() {
            return Ok(None);
        }
        Ok(Some(grounding_context(&results)))
    }

    /// Numbered overview of the processed materials in a collection.
    ///
    /// Unprocessed materials are omitted, matching what [`Retriever::search`]
    /// can actually reach. An empty collection yields an empty string.
    pub async fn materials_summary(&self, collection_id: &str) -> Result<String, RetrievalError> {
        let materials = self
            .index
            .list_materials(collection_id)
            .await
            .map_err(RetrievalError::Storage)?;

        let listings: Vec<MaterialListing> = materials
            .iter()
            .filter(|material| material.processed)
            .map(|material| {
                MaterialListing::new(
                    material.name.clone(),
                    material.kind.as_str(),
                    material.summary.clone(),
                )
            })
            .collect();
        Ok(format_materials_summary(&listings))
    }
}

/// Format search results as a citation-ready context block.
pub fn grounding_context(results: &[RetrievalResult]) -> String {
    let passages: Vec<Passage> = results
        .iter()
        .map(|result| Passage::new(result.material_name.clone(), result.text.clone()))
        .collect();
    format_grounding_context(&passages)
}
