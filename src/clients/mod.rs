//! External service contracts.
//!
//! The object store, the text detection (OCR) service, and the entity
//! detection (NER) service are consumed through narrow traits so the
//! pipeline can be exercised against in-memory fakes. The shipped
//! implementations speak HTTP with `reqwest`.

mod ner;
mod object_store;
mod ocr;

pub use ner::HttpEntityDetector;
pub use object_store::HttpObjectStore;
pub use ocr::HttpTextDetector;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{JobStatus, NamedEntity, OcrBlock};

/// Errors from an external service call.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("service error: {0}")]
    Api(String),

    #[error("invalid response: {0}")]
    Parse(String),
}

/// Stores uploaded documents under a bucket/key pair.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<(), ClientError>;
}

/// One page of paginated text detection results.
#[derive(Debug, Clone)]
pub struct BlockPage {
    pub blocks: Vec<OcrBlock>,
    pub next_token: Option<String>,
}

/// Asynchronous text detection (OCR) over stored documents.
#[async_trait]
pub trait TextDetector: Send + Sync {
    /// Start a text detection job for a stored object; returns the job id.
    async fn submit(&self, bucket: &str, key: &str) -> Result<String, ClientError>;

    /// Current status of a job.
    async fn status(&self, job_id: &str) -> Result<JobStatus, ClientError>;

    /// One page of result blocks, with a continuation token while more
    /// pages remain.
    async fn blocks(
        &self,
        job_id: &str,
        next_token: Option<&str>,
    ) -> Result<BlockPage, ClientError>;
}

/// Named entity detection over free text.
#[async_trait]
pub trait EntityDetector: Send + Sync {
    async fn detect(&self, text: &str, language: &str) -> Result<Vec<NamedEntity>, ClientError>;
}
