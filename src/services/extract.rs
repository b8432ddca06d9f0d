//! Text extraction and keyword merging.
//!
//! The pure half of the pipeline: turning OCR blocks into a document,
//! matching the skill vocabulary against it, filtering detected entities,
//! and merging both into the combined keyword set. Everything here is a
//! total function over its inputs; the only error is a line block that
//! arrives without text, which breaks the OCR service contract.

use std::collections::HashSet;

use crate::error::PipelineError;
use crate::models::{NamedEntity, OcrBlock};

/// Block type tag that carries line-level document text.
const LINE_BLOCK_TYPE: &str = "line";

/// Join the text of every line-level block, in input order, with newlines.
///
/// Empty input yields the empty string. A line block with no text is a
/// protocol violation by the OCR service and propagates as a malformed
/// response error.
pub fn extract_line_text(blocks: &[OcrBlock]) -> Result<String, PipelineError> {
    let mut lines = Vec::new();
    for block in blocks {
        if block.block_type != LINE_BLOCK_TYPE {
            continue;
        }
        match &block.text {
            Some(text) => lines.push(text.as_str()),
            None => {
                return Err(PipelineError::MalformedResponse(
                    "line block without text".to_string(),
                ))
            }
        }
    }
    Ok(lines.join("\n"))
}

/// Return the vocabulary terms that occur as case-insensitive substrings
/// of the text.
///
/// Containment is plain substring matching, so "java" also matches inside
/// "javascript". That imprecision is part of the matcher's contract; see
/// DESIGN.md.
pub fn match_skills(text: &str, vocabulary: &[String]) -> HashSet<String> {
    if text.is_empty() {
        return HashSet::new();
    }
    let haystack = text.to_lowercase();
    vocabulary
        .iter()
        .filter(|term| haystack.contains(&term.to_lowercase()))
        .cloned()
        .collect()
}

/// Lowercased text of every entity whose category is not excluded.
///
/// Duplicates are kept; the merger collapses them.
pub fn normalize_entities(
    entities: &[NamedEntity],
    excluded_categories: &HashSet<String>,
) -> Vec<String> {
    entities
        .iter()
        .filter(|e| !excluded_categories.contains(&e.category))
        .map(|e| e.text.to_lowercase())
        .collect()
}

/// Case-folded set union of matched skills and normalized entity text.
pub fn merge_keywords(skills: &HashSet<String>, entity_texts: &[String]) -> HashSet<String> {
    let mut combined: HashSet<String> = skills.iter().map(|s| s.to_lowercase()).collect();
    combined.extend(entity_texts.iter().map(|s| s.to_lowercase()));
    combined
}

/// Truncate to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
