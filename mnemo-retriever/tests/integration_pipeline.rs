//! End-to-end pipeline tests: ingest materials with a deterministic
//! embedding provider, then search them.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mnemo_embed::{EmbeddingProvider, EmbeddingResult};
use mnemo_retriever::ingestion::{IngestionConfig, IngestionEngine};
use mnemo_retriever::retrieval::{Retriever, SearchOptions};
use mnemo_retriever::storage::{
    CandidateFilter, ChunkMetadata, ChunkRecord, Material, MaterialIndex, MaterialKind,
};

/// Unit vector at a known cosine distance from the query axis [1, 0, 0].
fn unit(cosine: f32) -> Vec<f32> {
    vec![cosine, (1.0 - cosine * cosine).sqrt(), 0.0]
}

/// Maps text to fixed unit vectors so similarities are known in advance.
/// Queries land on the [1, 0, 0] axis; each keyword sits at a chosen cosine
/// from it.
struct KeyedProvider {
    calls: AtomicUsize,
}

impl KeyedProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for KeyedProvider {
    async fn embed_text(&self, text: &str) -> mnemo_embed::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lower = text.to_lowercase();
        let embedding = if lower.contains("recursion") {
            unit(0.92)
        } else if lower.contains("sorting") {
            unit(0.85)
        } else if lower.contains("cooking") {
            unit(0.50)
        } else {
            unit(1.0)
        };
        Ok(embedding)
    }

    async fn embed_texts(&self, texts: &[String]) -> mnemo_embed::Result<EmbeddingResult> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_text(text).await?);
        }
        Ok(EmbeddingResult::new(embeddings, 3))
    }

    fn embedding_dimension(&self) -> usize {
        3
    }

    fn provider_name(&self) -> &str {
        "keyed"
    }
}

async fn seed_collection(
    engine: &IngestionEngine,
) -> anyhow::Result<()> {
    let recursion = Material::new("m-recursion", "course-1", "Week 4 notes", MaterialKind::File);
    engine
        .ingest_material(&recursion, "Recursion solves a problem via smaller instances.")
        .await?;

    let sorting = Material::new("m-sorting", "course-1", "Week 3 notes", MaterialKind::File);
    engine
        .ingest_material(&sorting, "Sorting orders a sequence of comparable values.")
        .await?;

    let cooking = Material::new("m-cooking", "course-1", "Recipes", MaterialKind::File);
    engine
        .ingest_material(&cooking, "Cooking pasta takes about ten minutes of boiling.")
        .await?;

    Ok(())
}

fn stored_chunk(material_id: &str, index: usize, total: usize, cosine: f32) -> ChunkRecord {
    ChunkRecord {
        id: None,
        material_id: material_id.to_string(),
        text: format!("{material_id} chunk {index}"),
        embedding: Some(unit(cosine)),
        metadata: ChunkMetadata {
            chunk_index: index,
            total_chunks: total,
            page: None,
            section: None,
        },
    }
}

async fn store_material(
    index: &MaterialIndex,
    id: &str,
    name: &str,
    processed: bool,
    chunks: &[ChunkRecord],
) -> anyhow::Result<()> {
    let mut material = Material::new(id, "course-1", name, MaterialKind::File);
    material.processed = processed;
    index.upsert_material(&material).await?;
    index.replace_chunks(id, chunks).await?;
    Ok(())
}

#[tokio::test]
async fn test_search_ranks_and_thresholds() -> anyhow::Result<()> {
    let index = MaterialIndex::open_memory().await?;
    let provider = KeyedProvider::new();

    // Material A has two strong chunks, B one weak chunk, C never finished
    // ingestion. The query embeds onto the [1, 0, 0] axis.
    store_material(
        &index,
        "m-a",
        "Lecture notes A",
        true,
        &[stored_chunk("m-a", 0, 2, 0.92), stored_chunk("m-a", 1, 2, 0.85)],
    )
    .await?;
    store_material(
        &index,
        "m-b",
        "Lecture notes B",
        true,
        &[stored_chunk("m-b", 0, 1, 0.50)],
    )
    .await?;
    store_material(
        &index,
        "m-c",
        "Lecture notes C",
        false,
        &[stored_chunk("m-c", 0, 1, 0.99)],
    )
    .await?;

    let retriever = Retriever::new(index, provider);
    let results = retriever
        .search(
            "course-1",
            "What did we cover in class this week?",
            &SearchOptions::default(),
        )
        .await?;

    // B's chunk sits below the 0.7 threshold; C is unprocessed.
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.material_name == "Lecture notes A"));
    assert!((results[0].similarity - 0.92).abs() < 1e-3);
    assert!((results[1].similarity - 0.85).abs() < 1e-3);
    Ok(())
}

#[tokio::test]
async fn test_unprocessed_material_is_invisible() -> anyhow::Result<()> {
    let index = MaterialIndex::open_memory().await?;
    let provider = KeyedProvider::new();

    // Chunks exist but the material never finished ingestion.
    let pending = Material::new("m-pending", "course-1", "pending.txt", MaterialKind::File);
    index.upsert_material(&pending).await?;
    index
        .replace_chunks(
            "m-pending",
            &[ChunkRecord {
                id: None,
                material_id: "m-pending".to_string(),
                text: "Recursion notes still being ingested.".to_string(),
                embedding: Some(unit(0.99)),
                metadata: ChunkMetadata {
                    chunk_index: 0,
                    total_chunks: 1,
                    page: None,
                    section: None,
                },
            }],
        )
        .await?;

    let retriever = Retriever::new(index, provider);
    let results = retriever
        .search("course-1", "Explain recursion", &SearchOptions::default())
        .await?;
    assert!(results.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_empty_collection_skips_query_embedding() -> anyhow::Result<()> {
    let index = MaterialIndex::open_memory().await?;
    let provider = KeyedProvider::new();
    let retriever = Retriever::new(index, provider.clone());

    let results = retriever
        .search("course-1", "Explain recursion", &SearchOptions::default())
        .await?;
    assert!(results.is_empty());
    assert_eq!(provider.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_kind_filter_scopes_search() -> anyhow::Result<()> {
    let index = MaterialIndex::open_memory().await?;
    let provider = KeyedProvider::new();
    let engine = IngestionEngine::new(index.clone(), provider.clone(), IngestionConfig::default());
    seed_collection(&engine).await?;

    let syllabus = Material::new("m-syllabus", "course-1", "syllabus.pdf", MaterialKind::Syllabus);
    engine
        .ingest_material(&syllabus, "Recursion appears in the second unit of the course.")
        .await?;

    let options = SearchOptions::default()
        .with_filter(CandidateFilter::default().with_kind(MaterialKind::Syllabus));
    let retriever = Retriever::new(index, provider);
    let results = retriever
        .search("course-1", "Where is recursion covered?", &options)
        .await?;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].material_name, "syllabus.pdf");
    Ok(())
}

#[tokio::test]
async fn test_context_for_message_gates_on_trigger() -> anyhow::Result<()> {
    let index = MaterialIndex::open_memory().await?;
    let provider = KeyedProvider::new();
    let engine = IngestionEngine::new(index.clone(), provider.clone(), IngestionConfig::default());
    seed_collection(&engine).await?;
    let ingest_calls = provider.call_count();

    let retriever = Retriever::new(index, provider.clone());
    let options = SearchOptions::default();

    // Chit-chat neither searches nor embeds.
    let context = retriever
        .context_for_message("course-1", "thanks, see you tomorrow!", &options)
        .await?;
    assert!(context.is_none());
    assert_eq!(provider.call_count(), ingest_calls);

    // A material question produces a citation-ready block.
    let context = retriever
        .context_for_message("course-1", "What do the notes say about recursion?", &options)
        .await?
        .expect("expected grounding context");
    assert!(context.starts_with("Relevant information from the attached materials:"));
    assert!(context.contains("[Source: Week 4 notes]"));
    Ok(())
}

#[tokio::test]
async fn test_materials_summary_lists_processed_materials() -> anyhow::Result<()> {
    let index = MaterialIndex::open_memory().await?;
    let provider = KeyedProvider::new();
    let engine = IngestionEngine::new(index.clone(), provider.clone(), IngestionConfig::default());
    seed_collection(&engine).await?;

    // A material that never finished ingestion stays out of the overview.
    let pending = Material::new("m-pending", "course-1", "pending.txt", MaterialKind::File);
    index.upsert_material(&pending).await?;

    let retriever = Retriever::new(index, provider);
    let summary = retriever.materials_summary("course-1").await?;

    assert!(summary.starts_with("Available course materials:\n"));
    assert!(summary.contains("Week 4 notes (FILE): Recursion solves a problem"));
    assert!(summary.contains("Week 3 notes (FILE)"));
    assert!(summary.contains("Recipes (FILE)"));
    assert!(!summary.contains("pending.txt"));

    assert_eq!(retriever.materials_summary("course-2").await?, "");
    Ok(())
}
