//! Ingestion pipeline that turns uploaded materials into searchable chunks.
//!
//! ## Pipeline Flow
//!
//! ```text
//! Raw text → normalize → outline/summary → chunk → embed → replace_chunks
//!                ↑            ↑              ↑        ↑          ↑
//!           mnemo-context  mnemo-context  preset  mnemo-embed  SQLite
//! ```
//!
//! Every material ends up `processed = true` exactly once per ingestion
//! attempt: successfully indexed, skipped as unsupported, or failed with the
//! provider error recorded. Only a storage error leaves a material
//! unprocessed, and an unprocessed material never appears in search results.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use mnemo_context::{ChunkingPreset, WORDS_PER_PAGE, extract_outline, normalize_text, summarize};
use mnemo_embed::EmbeddingProvider;

use crate::storage::{
    ChunkMetadata, ChunkRecord, JobState, Material, MaterialIndex, MaterialKind, MaterialMetadata,
};

/// Text shorter than this after normalization is not worth indexing.
const MIN_TEXT_LEN: usize = 10;

/// Maximum summary length stored on a material.
const SUMMARY_LEN: usize = 300;

/// Content stored for materials whose text could not be indexed.
const PLACEHOLDER_CONTENT: &str = "[no readable content]";

/// Configuration for the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Hard cap on chunks stored per material. Truncation keeps one oversized
    /// upload from dominating every later similarity scan.
    pub max_chunks_per_material: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_chunks_per_material: 20,
        }
    }
}

impl IngestionConfig {
    pub fn with_max_chunks_per_material(mut self, max: usize) -> Self {
        self.max_chunks_per_material = max.max(1);
        self
    }
}

/// How ingestion ended for a material.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestionOutcome {
    /// Chunks were embedded and stored
    Indexed { chunks: usize },
    /// Content was too short to index; no chunks stored
    Skipped { reason: String },
    /// The embedding provider rejected the batch; no chunks stored
    Failed { error: String },
}

/// Orchestrates normalization, chunking, embedding, and storage for
/// uploaded materials.
pub struct IngestionEngine {
    index: MaterialIndex,
    provider: Arc<dyn EmbeddingProvider>,
    config: IngestionConfig,
}

impl IngestionEngine {
    pub fn new(
        index: MaterialIndex,
        provider: Arc<dyn EmbeddingProvider>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            index,
            provider,
            config,
        }
    }

    /// Ingest a material's raw text.
    ///
    /// Registers the material (unprocessed), runs the pipeline, and records
    /// the outcome on both the material row and its ingestion job. Provider
    /// failures are reported through the returned [`IngestionOutcome`];
    /// only storage errors surface as `Err`.
    pub async fn ingest_material(
        &self,
        material: &Material,
        raw_text: &str,
    ) -> Result<IngestionOutcome> {
        self.index
            .upsert_material(material)
            .await
            .context("registering material")?;
        self.index
            .set_job_state(&material.id, JobState::Running, None)
            .await?;

        match self.run_pipeline(material, raw_text).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                // The material stays unprocessed so a retry can be scheduled,
                // but the job must not be left stuck at running.
                let detail = format!("{err:#}");
                warn!(material_id = %material.id, "ingestion aborted: {detail}");
                if let Err(job_err) = self
                    .index
                    .set_job_state(&material.id, JobState::Failed, Some(&detail))
                    .await
                {
                    warn!(
                        material_id = %material.id,
                        "could not record job failure: {job_err:#}"
                    );
                }
                Err(err)
            }
        }
    }

    async fn run_pipeline(
        &self,
        material: &Material,
        raw_text: &str,
    ) -> Result<IngestionOutcome> {
        let text = normalize_text(raw_text);
        if text.len() < MIN_TEXT_LEN {
            let reason = "content empty or too short to index".to_string();
            info!(material_id = %material.id, "skipping material: {reason}");
            self.index
                .replace_chunks(&material.id, &[])
                .await
                .context("clearing chunks for skipped material")?;
            self.index
                .mark_processed(
                    &material.id,
                    Some(PLACEHOLDER_CONTENT),
                    None,
                    &MaterialMetadata::Unsupported {
                        reason: reason.clone(),
                    },
                )
                .await?;
            self.index
                .set_job_state(&material.id, JobState::Done, Some(&reason))
                .await?;
            return Ok(IngestionOutcome::Skipped { reason });
        }

        let summary = summarize(&text, SUMMARY_LEN);
        let metadata = describe_material(material.kind, &text);
        let preset = chunking_preset(material.kind);
        let mut chunk_texts = preset.chunk(&text);
        if chunk_texts.len() > self.config.max_chunks_per_material {
            warn!(
                material_id = %material.id,
                chunks = chunk_texts.len(),
                cap = self.config.max_chunks_per_material,
                "truncating oversized material"
            );
            chunk_texts.truncate(self.config.max_chunks_per_material);
        }

        let embeddings = match self.provider.embed_texts(&chunk_texts).await {
            Ok(result) => result.embeddings,
            Err(err) => {
                let error = err.to_string();
                warn!(
                    material_id = %material.id,
                    kind = %err.kind(),
                    "embedding failed: {error}"
                );
                self.index
                    .mark_failed(&material.id, &error, err.kind().as_str())
                    .await?;
                self.index
                    .set_job_state(&material.id, JobState::Failed, Some(&error))
                    .await?;
                return Ok(IngestionOutcome::Failed { error });
            }
        };

        let chunks = build_chunk_records(&material.id, chunk_texts, embeddings);
        let stored = chunks.len();
        self.index
            .replace_chunks(&material.id, &chunks)
            .await
            .context("storing chunks")?;
        self.index
            .mark_processed(&material.id, Some(&text), Some(&summary), &metadata)
            .await?;
        self.index
            .set_job_state(&material.id, JobState::Done, None)
            .await?;

        info!(material_id = %material.id, chunks = stored, "material indexed");
        Ok(IngestionOutcome::Indexed { chunks: stored })
    }

    pub fn index(&self) -> &MaterialIndex {
        &self.index
    }
}

fn chunking_preset(kind: MaterialKind) -> ChunkingPreset {
    match kind {
        MaterialKind::Syllabus => ChunkingPreset::SYLLABUS,
        MaterialKind::Assignment => ChunkingPreset::ASSIGNMENT,
        MaterialKind::File => ChunkingPreset::FILE,
    }
}

fn describe_material(kind: MaterialKind, text: &str) -> MaterialMetadata {
    let outline = extract_outline(text);
    match kind {
        MaterialKind::Syllabus => MaterialMetadata::Syllabus { outline },
        MaterialKind::Assignment => MaterialMetadata::Assignment { outline },
        MaterialKind::File => MaterialMetadata::File { outline },
    }
}

fn build_chunk_records(
    material_id: &str,
    chunk_texts: Vec<String>,
    embeddings: Vec<Vec<f32>>,
) -> Vec<ChunkRecord> {
    let total_chunks = chunk_texts.len();
    let mut records = Vec::with_capacity(total_chunks);
    let mut words_seen = 0usize;

    for (chunk_index, (text, embedding)) in
        chunk_texts.into_iter().zip(embeddings).enumerate()
    {
        // Rough page position from the cumulative word offset, matching the
        // page estimate in document outlines.
        let page = (words_seen / WORDS_PER_PAGE) as u32 + 1;
        words_seen += text.split_whitespace().count();

        records.push(ChunkRecord {
            id: None,
            material_id: material_id.to_string(),
            text,
            embedding: Some(embedding),
            metadata: ChunkMetadata {
                chunk_index,
                total_chunks,
                page: Some(page),
                section: None,
            },
        });
    }
    records
}
