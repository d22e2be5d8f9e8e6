//! Core SQLite database operations for materials, chunks, and ingestion jobs.
//!
//! ## Database Schema
//!
//! ```sql
//! -- Materials table: uploaded documents grouped into collections
//! CREATE TABLE materials (
//!     id TEXT PRIMARY KEY,             -- caller-supplied material id
//!     collection_id TEXT,              -- grouping key for search scope
//!     name TEXT,                       -- display name, used in citations
//!     kind TEXT,                       -- assignment | syllabus | file
//!     processed INTEGER,               -- 1 once ingestion has finished
//!     content TEXT,                    -- cleaned full text (optional)
//!     summary TEXT,                    -- short extractive summary (optional)
//!     metadata TEXT,                   -- MaterialMetadata as JSON
//!     created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
//! );
//!
//! -- Chunks table: embedded text segments of a material
//! CREATE TABLE chunks (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     material_id TEXT REFERENCES materials(id) ON DELETE CASCADE,
//!     chunk_index INTEGER,             -- position within the material
//!     content TEXT,                    -- chunk text
//!     embedding BLOB,                  -- f32 embedding vector (optional)
//!     metadata TEXT,                   -- ChunkMetadata as JSON
//!     created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
//! );
//!
//! -- Ingestion jobs: one row per material, tracks pipeline progress
//! CREATE TABLE ingestion_jobs (
//!     material_id TEXT PRIMARY KEY REFERENCES materials(id) ON DELETE CASCADE,
//!     state TEXT,                      -- pending | running | done | failed
//!     detail TEXT,                     -- human-readable failure detail
//!     updated_at TIMESTAMP
//! );
//! ```
//!
//! ## SQLite Optimizations
//!
//! - **WAL mode**: concurrent reads while ingestion writes
//! - **Large page size** (64KB): embedding blobs span fewer pages
//! - **Foreign keys**: deleting a material drops its chunks and job row
//! - **Auto-vacuum**: keeps database size manageable after deletions

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use super::{
    CandidateFilter, ChunkMetadata, ChunkRecord, CollectionChunk, JobState, Material,
    MaterialKind, MaterialMetadata, deserialize_embedding, serialize_embedding,
};

/// Status of a material's ingestion job.
#[derive(Debug, Clone)]
pub struct JobStatus {
    pub state: JobState,
    pub detail: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// SQLite-backed store for materials and their embedded chunks.
#[derive(Clone, Debug)]
pub struct MaterialIndex {
    pool: SqlitePool,
}

impl MaterialIndex {
    /// Opens the index with persistent SQLite storage at `base/mnemo.db`.
    pub async fn open(base: &Path) -> Result<Self> {
        let db_path = base.join("mnemo.db");

        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
                .create_if_missing(true)
                .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::Full)
                .page_size(1 << 16)
                .optimize_on_close(true, 1 << 10),
        )
        .await?;
        Self::new_with_pool(pool).await
    }

    /// Opens the index with in-memory SQLite storage for testing.
    ///
    /// The `sqlite::memory:` URL gives every pooled connection a view of the
    /// same database; per-connection `:memory:` databases would make the
    /// schema vanish between acquires.
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        Self::new_with_pool(pool).await
    }

    async fn new_with_pool(pool: SqlitePool) -> Result<Self> {
        Self::create_tables(&pool).await?;
        Ok(Self { pool })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS materials (
                id TEXT PRIMARY KEY,
                collection_id TEXT NOT NULL,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                processed INTEGER NOT NULL DEFAULT 0,
                content TEXT,
                summary TEXT,
                metadata TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                material_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB,
                metadata TEXT NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                CONSTRAINT unique_chunk UNIQUE(material_id, chunk_index),
                FOREIGN KEY (material_id) REFERENCES materials(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ingestion_jobs (
                material_id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                detail TEXT,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (material_id) REFERENCES materials(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_material ON chunks(material_id)")
            .execute(pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_materials_collection ON materials(collection_id)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Inserts a material, or refreshes its name and kind if the id already
    /// exists. Re-uploading resets `processed` so the material drops out of
    /// search until ingestion finishes again.
    pub async fn upsert_material(&self, material: &Material) -> Result<()> {
        let metadata_json = material
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO materials (id, collection_id, name, kind, processed, content, summary, metadata)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                collection_id = excluded.collection_id,
                name = excluded.name,
                kind = excluded.kind,
                processed = excluded.processed,
                content = excluded.content,
                summary = excluded.summary,
                metadata = excluded.metadata
            "#,
        )
        .bind(&material.id)
        .bind(&material.collection_id)
        .bind(&material.name)
        .bind(material.kind.as_str())
        .bind(material.processed)
        .bind(material.content.as_deref())
        .bind(material.summary.as_deref())
        .bind(metadata_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get a material by id
    pub async fn get_material(&self, id: &str) -> Result<Option<Material>> {
        let row = sqlx::query(
            "SELECT id, collection_id, name, kind, processed, content, summary, metadata
             FROM materials WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_material).transpose()
    }

    /// List the materials in a collection, newest first.
    pub async fn list_materials(&self, collection_id: &str) -> Result<Vec<Material>> {
        let rows = sqlx::query(
            "SELECT id, collection_id, name, kind, processed, content, summary, metadata
             FROM materials WHERE collection_id = ?1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_material).collect()
    }

    fn row_to_material(row: sqlx::sqlite::SqliteRow) -> Result<Material> {
        let kind: String = row.get("kind");
        let metadata_json: Option<String> = row.get("metadata");
        let metadata: Option<MaterialMetadata> = metadata_json
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .context("malformed material metadata")?;

        Ok(Material {
            id: row.get("id"),
            collection_id: row.get("collection_id"),
            name: row.get("name"),
            kind: MaterialKind::parse(&kind)?,
            processed: row.get("processed"),
            content: row.get("content"),
            summary: row.get("summary"),
            metadata,
        })
    }

    /// Mark a material processed, filling in what ingestion produced.
    pub async fn mark_processed(
        &self,
        id: &str,
        content: Option<&str>,
        summary: Option<&str>,
        metadata: &MaterialMetadata,
    ) -> Result<()> {
        let metadata_json = serde_json::to_string(metadata)?;
        sqlx::query(
            "UPDATE materials SET processed = 1, content = ?1, summary = ?2, metadata = ?3
             WHERE id = ?4",
        )
        .bind(content)
        .bind(summary)
        .bind(metadata_json)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark a material as failed. It still counts as processed so ingestion
    /// is not retried on every lookup, but with no chunks it never appears
    /// in search results.
    pub async fn mark_failed(&self, id: &str, error: &str, error_kind: &str) -> Result<()> {
        let metadata = MaterialMetadata::Failed {
            error: error.to_string(),
            error_kind: error_kind.to_string(),
        };
        self.mark_processed(id, None, None, &metadata).await
    }

    /// Delete a material. Its chunks and job row go with it via foreign keys,
    /// so a search racing this delete sees either all of the material's
    /// chunks or none of them.
    pub async fn delete_material(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM materials WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every material in a collection. Returns how many were removed.
    pub async fn delete_collection(&self, collection_id: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM materials WHERE collection_id = ?1")
            .bind(collection_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    /// Replace a material's chunks in a single transaction.
    ///
    /// Delete-then-insert keeps re-ingestion last-writer-wins: a reader never
    /// sees a mix of old and new chunks.
    pub async fn replace_chunks(&self, material_id: &str, chunks: &[ChunkRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE material_id = ?1")
            .bind(material_id)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            let embedding_bytes = chunk.embedding.as_deref().map(serialize_embedding);
            let metadata_json = serde_json::to_string(&chunk.metadata)?;

            sqlx::query(
                r#"
                INSERT INTO chunks (material_id, chunk_index, content, embedding, metadata)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(material_id)
            .bind(chunk.metadata.chunk_index as i64)
            .bind(&chunk.text)
            .bind(embedding_bytes)
            .bind(metadata_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Get a material's chunks in order
    pub async fn get_chunks(&self, material_id: &str) -> Result<Vec<ChunkRecord>> {
        let rows = sqlx::query(
            "SELECT id, material_id, content, embedding, metadata
             FROM chunks WHERE material_id = ?1 ORDER BY chunk_index",
        )
        .bind(material_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_chunk).collect()
    }

    fn row_to_chunk(row: sqlx::sqlite::SqliteRow) -> Result<ChunkRecord> {
        let embedding_bytes: Option<Vec<u8>> = row.get("embedding");
        let embedding = embedding_bytes
            .as_deref()
            .map(deserialize_embedding)
            .transpose()?;
        let metadata_json: String = row.get("metadata");
        let metadata: ChunkMetadata =
            serde_json::from_str(&metadata_json).context("malformed chunk metadata")?;

        Ok(ChunkRecord {
            id: Some(row.get("id")),
            material_id: row.get("material_id"),
            text: row.get("content"),
            embedding,
            metadata,
        })
    }

    /// Load the embedded chunks of a collection's processed materials,
    /// narrowed by `filter`. These are the candidates for a similarity scan.
    pub async fn collection_candidates(
        &self,
        collection_id: &str,
        filter: &CandidateFilter,
    ) -> Result<Vec<CollectionChunk>> {
        let mut sql = String::from(
            "SELECT c.id, c.material_id, c.content, c.embedding, c.metadata,
                    m.name AS material_name, m.kind AS material_kind
             FROM chunks c
             JOIN materials m ON m.id = c.material_id
             WHERE m.collection_id = ?
               AND m.processed = 1
               AND c.embedding IS NOT NULL",
        );
        if filter.kind.is_some() {
            sql.push_str(" AND m.kind = ?");
        }
        if filter.page.is_some() {
            sql.push_str(" AND json_extract(c.metadata, '$.page') = ?");
        }
        if filter.section.is_some() {
            sql.push_str(" AND json_extract(c.metadata, '$.section') = ?");
        }
        sql.push_str(" ORDER BY c.material_id, c.chunk_index");

        let mut query = sqlx::query(&sql).bind(collection_id);
        if let Some(kind) = filter.kind {
            query = query.bind(kind.as_str());
        }
        if let Some(page) = filter.page {
            query = query.bind(page as i64);
        }
        if let Some(section) = filter.section.as_deref() {
            query = query.bind(section);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            let kind: String = row.get("material_kind");
            let material_name: String = row.get("material_name");
            let chunk = Self::row_to_chunk(row)?;
            candidates.push(CollectionChunk {
                chunk,
                material_name,
                material_kind: MaterialKind::parse(&kind)?,
            });
        }
        Ok(candidates)
    }

    /// Record the state of a material's ingestion job.
    pub async fn set_job_state(
        &self,
        material_id: &str,
        state: JobState,
        detail: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ingestion_jobs (material_id, state, detail, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(material_id) DO UPDATE SET
                state = excluded.state,
                detail = excluded.detail,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(material_id)
        .bind(state.as_str())
        .bind(detail)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get a material's ingestion job status
    pub async fn job_status(&self, material_id: &str) -> Result<Option<JobStatus>> {
        let row = sqlx::query(
            "SELECT state, detail, updated_at FROM ingestion_jobs WHERE material_id = ?1",
        )
        .bind(material_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let state: String = row.get("state");
            let updated_at: DateTime<Utc> = row.get("updated_at");
            Ok(JobStatus {
                state: JobState::parse(&state)?,
                detail: row.get("detail"),
                updated_at,
            })
        })
        .transpose()
    }

    /// Get the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
