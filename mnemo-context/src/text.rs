//! Whitespace normalization and overlapping sentence chunking.
//!
//! Raw extracted text arrives here after upstream format-specific extraction
//! and leaves as a cleaned string split into bounded, overlapping chunks that
//! are ready for embedding. Sentence splitting is deliberately naive (any run
//! of `.`, `!`, `?` ends a sentence, abbreviations included), a known and
//! accepted limitation.
//!
//! Chunking is greedy: sentences accumulate into the current chunk until the
//! next one would push it past `target_size` characters, at which point the
//! chunk is emitted and the next chunk is seeded with the last `overlap / 5`
//! words of the emitted chunk so adjacent chunks share context across their
//! boundary. The trailing partial chunk is always emitted.
//!
//! The chunker never drops or truncates input. Capping how many chunks are
//! actually embedded is the caller's cost-control policy, not the chunker's.

use regex::Regex;
use std::sync::LazyLock;

/// Horizontal whitespace runs (everything but newlines).
static HORIZONTAL_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\S\n]+").unwrap());

/// C0/C1 control characters, minus newline which normalization preserves.
static CONTROL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x08\x0B-\x1F\x7F\u{80}-\u{9F}]").unwrap());

/// Spaces hugging a newline.
static SPACE_AROUND_NEWLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" ?\n ?").unwrap());

/// Three or more consecutive newlines.
static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Sentence-ending punctuation runs.
static SENTENCE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());

/// Chunk sizing parameters for a class of material.
///
/// Which preset applies to which material is caller policy: long structured
/// documents read better in large chunks, short assignment descriptions in
/// small ones. The chunker itself treats every preset the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingPreset {
    /// Maximum characters accumulated into one chunk before it is emitted.
    pub target_size: usize,
    /// Overlap in characters; the seed carried across a chunk boundary
    /// is the last `overlap / 5` words of the previous chunk.
    pub overlap: usize,
}

impl ChunkingPreset {
    pub const fn new(target_size: usize, overlap: usize) -> Self {
        Self {
            target_size,
            overlap,
        }
    }

    /// Large structured documents (syllabi, handbooks).
    pub const SYLLABUS: Self = Self::new(2000, 400);
    /// Short assignment descriptions.
    pub const ASSIGNMENT: Self = Self::new(800, 160);
    /// Generic uploaded files.
    pub const FILE: Self = Self::new(1000, 200);

    /// Chunk `text` with this preset's parameters.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.target_size, self.overlap)
    }
}

/// Clean raw extracted text for chunking and storage.
///
/// Collapses runs of horizontal whitespace to single spaces, strips control
/// characters (newlines survive), collapses three or more consecutive
/// newlines to two, and trims. Returns an empty string for blank input.
pub fn normalize_text(text: &str) -> String {
    let cleaned = CONTROL_CHARS.replace_all(text, "");
    let cleaned = HORIZONTAL_WS.replace_all(&cleaned, " ");
    let cleaned = SPACE_AROUND_NEWLINE.replace_all(&cleaned, "\n");
    let cleaned = EXCESS_NEWLINES.replace_all(&cleaned, "\n\n");
    cleaned.trim().to_string()
}

/// Split `text` into overlapping chunks of at most `target_size` characters.
///
/// Sentences are the unit of accumulation; a single sentence longer than
/// `target_size` still becomes (part of) a chunk rather than being dropped.
/// Each chunk after the first starts with the last `overlap / 5` words of
/// the chunk before it. Empty or blank input yields no chunks, not an error.
pub fn chunk_text(text: &str, target_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in SENTENCE_BOUNDARY.split(text) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        if !current.is_empty() && current.len() + 1 + sentence.len() > target_size {
            // Seed the next chunk with the tail of the one being emitted so
            // context survives the boundary.
            let tail_words = overlap / 5;
            let words: Vec<&str> = current.split_whitespace().collect();
            let tail_start = words.len().saturating_sub(tail_words);
            let mut next = words[tail_start..].join(" ");
            if !next.is_empty() {
                next.push(' ');
            }
            next.push_str(sentence);

            chunks.push(std::mem::replace(&mut current, next));
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(sentence);
        }
    }

    let last = current.trim();
    if !last.is_empty() {
        chunks.push(last.to_string());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_text("a   b\t\tc"), "a b c");
        assert_eq!(normalize_text("  padded  "), "padded");
    }

    #[test]
    fn test_normalize_strips_control_characters() {
        assert_eq!(normalize_text("a\x00b\x1Fc\x7Fd"), "abcd");
    }

    #[test]
    fn test_normalize_collapses_newline_runs() {
        assert_eq!(normalize_text("one\n\n\n\ntwo"), "one\n\ntwo");
        // Two newlines are a paragraph break and stay untouched.
        assert_eq!(normalize_text("one\n\ntwo"), "one\n\ntwo");
    }

    #[test]
    fn test_normalize_empty_input() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   \n\n  "), "");
    }

    #[test]
    fn test_chunk_empty_input_yields_no_chunks() {
        assert!(chunk_text("", 1000, 200).is_empty());
        assert!(chunk_text("   ", 1000, 200).is_empty());
    }

    #[test]
    fn test_chunk_short_text_single_chunk() {
        let chunks = chunk_text("One sentence. Another sentence.", 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "One sentence Another sentence");
    }

    #[test]
    fn test_chunk_long_paragraph_overlap_and_bounds() {
        // A single ~3500-character paragraph of uniform short sentences.
        let text = (0..140)
            .map(|i| format!("Sentence number {i} covers topic. "))
            .collect::<String>();
        assert!(text.len() >= 3500);

        let chunks = chunk_text(&text, 1000, 200);
        assert!(chunks.len() >= 4, "expected >= 4 chunks, got {}", chunks.len());

        for chunk in &chunks[..chunks.len() - 1] {
            assert!(chunk.len() <= 1000, "chunk exceeds target: {}", chunk.len());
        }

        // Every chunk after the first starts with words from the tail of the
        // previous chunk.
        for pair in chunks.windows(2) {
            let prev_words: Vec<&str> = pair[0].split_whitespace().collect();
            let first_word = pair[1].split_whitespace().next().unwrap();
            let tail = &prev_words[prev_words.len().saturating_sub(40)..];
            assert!(
                tail.contains(&first_word),
                "chunk does not start with overlap from its predecessor"
            );
        }
    }

    #[test]
    fn test_chunk_oversized_sentence_still_emitted() {
        let giant = format!("{}.", "x".repeat(500));
        let chunks = chunk_text(&giant, 100, 20);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 500);
    }

    #[test]
    fn test_presets_scale_with_material_kind() {
        assert!(ChunkingPreset::SYLLABUS.target_size > ChunkingPreset::FILE.target_size);
        assert!(ChunkingPreset::FILE.target_size > ChunkingPreset::ASSIGNMENT.target_size);
    }
}
