//! Data model types shared across the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One unit of OCR output: a detected region with a type tag and text.
///
/// Only blocks whose `block_type` is `"line"` carry document text we care
/// about; other tags (pages, words) are structural and are skipped during
/// extraction. A line block without text violates the OCR service contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrBlock {
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl OcrBlock {
    /// Convenience constructor for a line-level text block.
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            block_type: "line".to_string(),
            text: Some(text.into()),
        }
    }
}

/// A named entity returned by the entity detection service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub text: String,
    pub category: String,
}

/// Wire status of an asynchronous text detection job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
    Partial,
}

/// Terminal outcome observed by the job poller.
///
/// Once a job reaches one of these it is never polled again. `Partial` and
/// `TimedOut` are failures like `Failed`, but the distinction is kept so
/// logs and errors can say which one actually happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed,
    Partial,
    TimedOut,
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobOutcome::Succeeded => "succeeded",
            JobOutcome::Failed => "failed",
            JobOutcome::Partial => "partially succeeded",
            JobOutcome::TimedOut => "timed out",
        };
        f.write_str(s)
    }
}

/// Aggregate output of one pipeline run.
///
/// Built once per request, handed to the telemetry recorder and the HTTP
/// response, then dropped.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Bucket the uploaded document was stored in.
    pub bucket: String,
    /// Object key the uploaded document was stored under.
    pub key: String,
    /// Identifier of the text detection job.
    pub job_id: String,
    /// Full extracted document text, line blocks joined by newlines.
    pub text: String,
    /// Total number of OCR blocks returned across all result pages.
    pub block_count: usize,
    /// Vocabulary terms found in the text, sorted.
    pub matched_skills: Vec<String>,
    /// Raw entities returned by the entity detection service.
    pub entities: Vec<NamedEntity>,
    /// Case-folded union of matched skills and retained entity text, sorted.
    pub combined_keywords: Vec<String>,
}

impl ExtractionResult {
    /// Storage location in `bucket/key` form, as surfaced to callers.
    pub fn storage_path(&self) -> String {
        format!("{}/{}", self.bucket, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_deserializes_from_snake_case() {
        let s: JobStatus = serde_json::from_str("\"partial\"").unwrap();
        assert_eq!(s, JobStatus::Partial);
        let s: JobStatus = serde_json::from_str("\"succeeded\"").unwrap();
        assert_eq!(s, JobStatus::Succeeded);
    }

    #[test]
    fn ocr_block_tolerates_missing_text() {
        let b: OcrBlock = serde_json::from_str("{\"block_type\":\"page\"}").unwrap();
        assert_eq!(b.block_type, "page");
        assert!(b.text.is_none());
    }

    #[test]
    fn job_outcome_display() {
        assert_eq!(JobOutcome::TimedOut.to_string(), "timed out");
        assert_eq!(JobOutcome::Partial.to_string(), "partially succeeded");
    }
}
