//! Ingestion and semantic retrieval for course materials.
//!
//! This crate stores uploaded documents in SQLite, splits them into
//! overlapping chunks, embeds the chunks through an external provider, and
//! answers similarity searches scoped to a collection.
//!
//! ## Key Components
//!
//! - [`storage::MaterialIndex`]: SQLite persistence for materials, chunks,
//!   and ingestion jobs
//! - [`ingestion::IngestionEngine`]: the normalize → chunk → embed → store
//!   pipeline
//! - [`retrieval::Retriever`]: query embedding, brute-force cosine ranking,
//!   and grounding-context assembly
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use mnemo_embed::{EmbedConfig, GeminiEmbedding};
//! use mnemo_retriever::ingestion::{IngestionConfig, IngestionEngine};
//! use mnemo_retriever::retrieval::{Retriever, SearchOptions};
//! use mnemo_retriever::storage::{Material, MaterialIndex, MaterialKind};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let index = MaterialIndex::open(std::path::Path::new(".")).await?;
//! let provider = Arc::new(GeminiEmbedding::new(EmbedConfig::gemini("api-key"))?);
//!
//! let engine = IngestionEngine::new(index.clone(), provider.clone(), IngestionConfig::default());
//! let material = Material::new("m1", "course-1", "Week 3 notes", MaterialKind::File);
//! engine.ingest_material(&material, "Merge sort runs in O(n log n)...").await?;
//!
//! let retriever = Retriever::new(index, provider);
//! let results = retriever
//!     .search("course-1", "What does merge sort cost?", &SearchOptions::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod ingestion;
pub mod retrieval;
pub mod similarity;
pub mod storage;

pub use ingestion::{IngestionConfig, IngestionEngine, IngestionOutcome};
pub use retrieval::{Retriever, RetrievalError, SearchOptions};
pub use similarity::{RetrievalResult, cosine_similarity};
pub use storage::{Material, MaterialIndex, MaterialKind};
