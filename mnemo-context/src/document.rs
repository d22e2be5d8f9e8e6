//! Document outline and summary extraction.
//!
//! Cheap, heuristic metadata pulled from normalized text at ingestion time:
//! a probable title, any `Chapter N: ...`-style section headers, a rough page
//! count, and a short extractive summary. None of these call out to a model;
//! they are string scans over the cleaned text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Words-per-page approximation used for page estimates.
pub const WORDS_PER_PAGE: usize = 500;

static TOPIC_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?im)^Chapter \d+[:\s]+(.+)$",
        r"(?im)^Section \d+[:\s]+(.+)$",
        r"(?im)^Unit \d+[:\s]+(.+)$",
        r"(?im)^Module \d+[:\s]+(.+)$",
        r"(?im)^Topic[:\s]+(.+)$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Structural metadata extracted from a document's text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentOutline {
    /// First plausible title line, if one was found.
    pub title: Option<String>,
    /// Section headers matching chapter/section/unit/module/topic patterns.
    pub topics: Vec<String>,
    /// Estimated page count at [`WORDS_PER_PAGE`] words per page.
    pub page_count: u32,
}

/// Extract an outline from normalized document text.
pub fn extract_outline(text: &str) -> DocumentOutline {
    // First non-empty line under 200 chars is the best title guess.
    let title = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && line.len() < 200)
        .map(str::to_string);

    // Scan line by line so interleaved header styles keep document order.
    let mut topics = Vec::new();
    for line in text.lines() {
        for pattern in TOPIC_PATTERNS.iter() {
            if let Some(captures) = pattern.captures(line) {
                if let Some(topic) = captures.get(1) {
                    topics.push(topic.as_str().trim().to_string());
                }
            }
        }
    }

    let word_count = text.split_whitespace().count();
    let page_count = word_count.div_ceil(WORDS_PER_PAGE) as u32;

    DocumentOutline {
        title,
        topics,
        page_count,
    }
}

/// Produce a short extractive summary of normalized document text.
///
/// Picks the first paragraph between 50 and 1000 characters; if no paragraph
/// qualifies, falls back to a prefix of the text. Output never exceeds
/// `max_len` characters.
pub fn summarize(text: &str, max_len: usize) -> String {
    let mut summary = text
        .split("\n\n")
        .map(str::trim)
        .find(|p| p.len() > 50 && p.len() < 1000)
        .unwrap_or("")
        .to_string();

    if summary.is_empty() {
        summary = text.chars().take(max_len).collect();
    }

    if summary.len() > max_len {
        let cut = summary
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= max_len.saturating_sub(3))
            .last()
            .unwrap_or(0);
        summary.truncate(cut);
        summary.push_str("...");
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_title_is_first_short_line() {
        let text = "Intro to Databases\n\nThis course covers relational models.";
        let outline = extract_outline(text);
        assert_eq!(outline.title.as_deref(), Some("Intro to Databases"));
    }

    #[test]
    fn test_outline_topics_from_headers() {
        let text = "Syllabus\nChapter 1: Relational Algebra\nChapter 2: Indexing\nSection 3: Recovery";
        let outline = extract_outline(text);
        assert_eq!(
            outline.topics,
            vec!["Relational Algebra", "Indexing", "Recovery"]
        );
    }

    #[test]
    fn test_outline_topics_keep_document_order() {
        // Mixed header styles must not regroup by style.
        let text = "Syllabus\nChapter 1: Sorting\nSection 2: Heaps\nChapter 3: Graphs\nUnit 4: Hashing";
        let outline = extract_outline(text);
        assert_eq!(outline.topics, vec!["Sorting", "Heaps", "Graphs", "Hashing"]);
    }

    #[test]
    fn test_outline_page_count_estimate() {
        let text = (0..1200).map(|_| "word ").collect::<String>();
        let outline = extract_outline(&text);
        assert_eq!(outline.page_count, 3);
    }

    #[test]
    fn test_summarize_picks_first_real_paragraph() {
        let text = "Title\n\nThis paragraph is comfortably longer than fifty characters and should win.\n\nShorter trailer.";
        let summary = summarize(text, 500);
        assert!(summary.starts_with("This paragraph is comfortably"));
    }

    #[test]
    fn test_summarize_truncates_to_max_len() {
        let text = format!("{}\n\n{}", "T", "a".repeat(800));
        let summary = summarize(&text, 100);
        assert!(summary.len() <= 100);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_summarize_falls_back_to_prefix() {
        let summary = summarize("tiny", 100);
        assert_eq!(summary, "tiny");
    }
}
