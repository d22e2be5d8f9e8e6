//! mnemo-context: text preparation utilities for the mnemo retrieval system.
//!
//! Everything in this crate is pure, synchronous text processing, the pieces
//! of the pipeline that need no database and no network:
//!
//! - **[`text`]**: whitespace normalization and overlapping sentence chunking
//! - **[`document`]**: document outline (title/topics/pages) and summary extraction
//! - **[`query`]**: the retrieval trigger heuristic and the grounding-context formatter
//!
//! The async side of the pipeline (embedding generation, persistence,
//! similarity search) lives in `mnemo-embed` and `mnemo-retriever`.

pub mod document;
pub mod query;
pub mod text;

pub use document::{DocumentOutline, WORDS_PER_PAGE, extract_outline, summarize};
pub use query::{
    MaterialListing, Passage, format_grounding_context, format_materials_summary, should_retrieve,
};
pub use text::{ChunkingPreset, chunk_text, normalize_text};
