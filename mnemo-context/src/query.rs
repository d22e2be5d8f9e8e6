//! Retrieval trigger heuristic and grounding-context formatting.
//!
//! [`should_retrieve`] decides whether a chat query is worth a retrieval pass
//! at all. It is a pure keyword/pattern check (no network, deterministic,
//! and cheap enough to run on every message). Both false positives (an
//! unnecessary scan) and false negatives (a missed grounding opportunity)
//! are acceptable costs of keeping it this simple.
//!
//! [`format_grounding_context`] renders ranked retrieval results into the
//! cited text block that gets prefixed onto a generation request.

use serde::Serialize;

/// Phrases suggesting the user is referring to attached materials.
const MATERIAL_KEYWORDS: &[&str] = &[
    "textbook",
    "chapter",
    "page",
    "lecture",
    "slides",
    "notes",
    "material",
    "document",
    "reading",
    "assignment",
    "according to",
    "based on",
    "from the",
    "in the course",
    "we learned",
    "we covered",
    "professor said",
    "homework",
    "problem set",
];

/// Question shapes that usually benefit from grounding context.
const QUESTION_SHAPES: &[&str] = &["what", "explain", "define", "describe", "how does", "why"];

/// Decide whether `query` should trigger a retrieval pass.
pub fn should_retrieve(query: &str) -> bool {
    let lower = query.to_lowercase();

    MATERIAL_KEYWORDS.iter().any(|kw| lower.contains(kw))
        || QUESTION_SHAPES.iter().any(|shape| lower.contains(shape))
}

/// A retrieved chunk paired with the display name of its source material.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Passage {
    pub source: String,
    pub text: String,
}

impl Passage {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }
}

/// Format retrieved passages into a citation-annotated context block.
///
/// Empty input yields an empty string, never a header with zero sources and
/// a dangling instruction.
pub fn format_grounding_context(passages: &[Passage]) -> String {
    if passages.is_empty() {
        return String::new();
    }

    let mut context = String::from("Relevant information from the attached materials:\n\n");

    for passage in passages {
        context.push_str(&format!("[Source: {}]\n{}\n\n", passage.source, passage.text));
    }

    context.push_str("---\n\n");
    context.push_str(
        "Use the above information to help answer the question, citing sources when appropriate.",
    );

    context
}

/// How much of a material summary the listing shows before truncating.
const LISTING_SUMMARY_LEN: usize = 100;

/// One processed material as it appears in a collection overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialListing {
    pub name: String,
    pub kind: String,
    pub summary: Option<String>,
}

impl MaterialListing {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, summary: Option<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            summary,
        }
    }
}

/// Format a numbered overview of the materials available in a collection.
///
/// Summaries are cut at [`LISTING_SUMMARY_LEN`] characters so the overview
/// stays a listing rather than a second context block. Empty input yields an
/// empty string.
pub fn format_materials_summary(listings: &[MaterialListing]) -> String {
    if listings.is_empty() {
        return String::new();
    }

    let mut summary = String::from("Available course materials:\n");

    for (index, listing) in listings.iter().enumerate() {
        summary.push_str(&format!(
            "{}. {} ({})",
            index + 1,
            listing.name,
            listing.kind.to_uppercase()
        ));
        if let Some(text) = &listing.summary {
            let excerpt: String = text.chars().take(LISTING_SUMMARY_LEN).collect();
            summary.push_str(&format!(": {excerpt}..."));
        }
        summary.push('\n');
    }

    summary
}
