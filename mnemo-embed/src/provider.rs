//! Embedding provider trait and the Gemini HTTP implementation.

use async_trait::async_trait;
use futures::future;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};

/// Embeddings for a batch of texts, in input order.
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    pub embeddings: Vec<Vec<f32>>,
    pub dimension: usize,
}

impl EmbeddingResult {
    pub fn new(embeddings: Vec<Vec<f32>>, dimension: usize) -> Self {
        Self {
            embeddings,
            dimension,
        }
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// A source of text embeddings.
///
/// The retrieval layer holds providers behind `Arc<dyn EmbeddingProvider>`
/// so tests can substitute a deterministic in-process implementation.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, preserving input order.
    ///
    /// Any single failure fails the whole batch; partial results are never
    /// returned.
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Dimension of the vectors this provider produces.
    fn embedding_dimension(&self) -> usize;

    /// Short name for logging.
    fn provider_name(&self) -> &str;
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

/// Embedding provider backed by the Gemini `embedContent` API.
pub struct GeminiEmbedding {
    client: reqwest::Client,
    config: EmbedConfig,
}

impl GeminiEmbedding {
    pub fn new(config: EmbedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| EmbedError::Unknown(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!(
            "{}/v1beta/models/{}:embedContent",
            self.config.base_url, self.config.model
        );
        let request = EmbedContentRequest {
            content: Content {
                parts: vec![Part { text }],
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key())])
            .json(&request)
            .send()
            .await
            .map_err(EmbedError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::classify_response(status, &body));
        }

        let parsed: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::Unknown(format!("malformed embedding response: {e}")))?;

        if parsed.embedding.values.is_empty() {
            return Err(EmbedError::Unknown(
                "provider returned an empty embedding".to_string(),
            ));
        }
        Ok(parsed.embedding.values)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedding {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.request_embedding(text).await
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(Vec::new(), self.config.dimension));
        }

        let groups: Vec<&[String]> = texts.chunks(self.config.batch_size).collect();
        let last_group = groups.len() - 1;
        let mut embeddings = Vec::with_capacity(texts.len());

        for (group_index, group) in groups.iter().enumerate() {
            debug!(
                group = group_index + 1,
                groups = last_group + 1,
                texts = group.len(),
                model = %self.config.model,
                "embedding batch group"
            );
            let requests = group.iter().map(|text| self.request_embedding(text));
            embeddings.extend(future::try_join_all(requests).await?);

            // No point sleeping after the final group.
            if group_index < last_group {
                tokio::time::sleep(self.config.batch_delay).await;
            }
        }

        Ok(EmbeddingResult::new(embeddings, self.config.dimension))
    }

    fn embedding_dimension(&self) -> usize {
        self.config.dimension
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}
