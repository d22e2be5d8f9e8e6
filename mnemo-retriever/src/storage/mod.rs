//! Storage layer for course materials and their embedded chunks.
//!
//! This module defines the data types persisted by [`MaterialIndex`] and the
//! embedding blob encoding shared by writes and reads.
//!
//! ## Key Components
//!
//! - **Material**: an uploaded document (assignment, syllabus, or generic file)
//! - **ChunkRecord**: a text segment of a material with an optional f32 embedding
//! - **MaterialMetadata**: what ingestion learned about a material
//! - **CandidateFilter**: narrows which chunks a similarity search considers
//!
//! Embeddings are stored as little-endian f32 blobs so the vector read back
//! is bit-identical to the vector written.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use mnemo_context::DocumentOutline;

pub mod material_index;

pub use material_index::MaterialIndex;

/// What kind of document a material is. Drives the chunking preset during
/// ingestion and is a filterable attribute during search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    Assignment,
    Syllabus,
    File,
}

impl MaterialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialKind::Assignment => "assignment",
            MaterialKind::Syllabus => "syllabus",
            MaterialKind::File => "file",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "assignment" => Ok(MaterialKind::Assignment),
            "syllabus" => Ok(MaterialKind::Syllabus),
            "file" => Ok(MaterialKind::File),
            other => bail!("unknown material kind: {other}"),
        }
    }
}

/// Structured result of ingesting a material, stored as JSON on the
/// materials row. The variant records how far ingestion got.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialMetadata {
    /// Indexed syllabus
    Syllabus { outline: DocumentOutline },
    /// Indexed assignment
    Assignment { outline: DocumentOutline },
    /// Indexed generic file
    File { outline: DocumentOutline },
    /// Content too short or unreadable to index
    Unsupported { reason: String },
    /// Embedding generation failed; `error_kind` is the provider
    /// classification (auth, quota, safety, unknown)
    Failed { error: String, error_kind: String },
}

/// An uploaded document belonging to a collection.
#[derive(Debug, Clone)]
pub struct Material {
    pub id: String,
    pub collection_id: String,
    pub name: String,
    pub kind: MaterialKind,
    /// True once ingestion has finished with this material, successfully or
    /// not. Unprocessed materials are invisible to search.
    pub processed: bool,
    /// Cleaned full text, filled when ingestion succeeds
    pub content: Option<String>,
    /// Short extractive summary, filled when ingestion succeeds
    pub summary: Option<String>,
    pub metadata: Option<MaterialMetadata>,
}

impl Material {
    pub fn new(
        id: impl Into<String>,
        collection_id: impl Into<String>,
        name: impl Into<String>,
        kind: MaterialKind,
    ) -> Self {
        Self {
            id: id.into(),
            collection_id: collection_id.into(),
            name: name.into(),
            kind,
            processed: false,
            content: None,
            summary: None,
            metadata: None,
        }
    }
}

/// Per-chunk metadata, stored as JSON alongside the chunk text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// Estimated page in the source document, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Section heading the chunk falls under, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

/// A text segment of a material with its optional embedding.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: Option<i64>,
    pub material_id: String,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
    pub metadata: ChunkMetadata,
}

/// A chunk joined with its parent material, as loaded for similarity search.
#[derive(Debug, Clone)]
pub struct CollectionChunk {
    pub chunk: ChunkRecord,
    pub material_name: String,
    pub material_kind: MaterialKind,
}

/// Narrows the candidate set before the similarity scan.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub kind: Option<MaterialKind>,
    pub page: Option<u32>,
    pub section: Option<String>,
}

impl CandidateFilter {
    pub fn with_kind(mut self, kind: MaterialKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }
}

/// Lifecycle of a material's ingestion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Done,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobState::Pending),
            "running" => Ok(JobState::Running),
            "done" => Ok(JobState::Done),
            "failed" => Ok(JobState::Failed),
            other => bail!("unknown job state: {other}"),
        }
    }
}

/// Encode an embedding as an f32 byte blob for SQLite storage.
pub fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice::<f32, u8>(embedding).to_vec()
}

/// Decode an embedding blob written by [`serialize_embedding`].
///
/// `pod_collect_to_vec` copies instead of casting in place, so blobs handed
/// back by sqlx do not need to be 4-byte aligned.
pub fn deserialize_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        bail!(
            "embedding blob length {} is not a multiple of 4",
            bytes.len()
        );
    }
    Ok(bytemuck::pod_collect_to_vec::<u8, f32>(bytes))
}
