//! Embedding generation for course materials.
//!
//! This crate turns text into dense vectors by calling an external embedding
//! provider over HTTP. It exposes:
//!
//! - [`EmbeddingProvider`]: the async trait the retrieval layer programs against
//! - [`GeminiEmbedding`]: a provider backed by Google's Gemini embedding API
//! - [`EmbedConfig`]: connection, model, and batching settings
//! - [`EmbedError`]: typed failures with provider-error classification
//!
//! Batches are embedded in fixed-size groups with a short delay between
//! groups so a large ingestion run stays under the provider's rate limits.

pub mod config;
pub mod error;
pub mod provider;

pub use config::EmbedConfig;
pub use error::{EmbedError, ProviderErrorKind, Result};
pub use provider::{EmbeddingProvider, EmbeddingResult, GeminiEmbedding};
