//! HTTP text detection (OCR) client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{JobStatus, OcrBlock};

use super::{BlockPage, ClientError, TextDetector};

/// Client for the asynchronous text detection service.
///
/// Jobs are submitted against a stored object and polled by id; results
/// come back as paginated block lists.
pub struct HttpTextDetector {
    endpoint: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    bucket: &'a str,
    key: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: JobStatus,
}

#[derive(Debug, Deserialize)]
struct BlocksResponse {
    #[serde(default)]
    blocks: Vec<OcrBlock>,
    #[serde(default)]
    next_token: Option<String>,
}

impl HttpTextDetector {
    pub fn new(endpoint: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl TextDetector for HttpTextDetector {
    async fn submit(&self, bucket: &str, key: &str) -> Result<String, ClientError> {
        let url = format!("{}/jobs", self.endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&SubmitRequest { bucket, key })
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClientError::Api(format!("HTTP {}", resp.status())));
        }

        let submitted: SubmitResponse = resp
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        if submitted.job_id.is_empty() {
            return Err(ClientError::Parse("empty job id".to_string()));
        }

        debug!(job_id = %submitted.job_id, key, "text detection job submitted");
        Ok(submitted.job_id)
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus, ClientError> {
        let url = format!("{}/jobs/{}", self.endpoint, job_id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClientError::Api(format!("HTTP {}", resp.status())));
        }

        let status: StatusResponse = resp
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(status.status)
    }

    async fn blocks(
        &self,
        job_id: &str,
        next_token: Option<&str>,
    ) -> Result<BlockPage, ClientError> {
        let mut url = format!("{}/jobs/{}/blocks", self.endpoint, job_id);
        if let Some(token) = next_token {
            url.push_str("?next_token=");
            url.push_str(token);
        }

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClientError::Api(format!("HTTP {}", resp.status())));
        }

        let page: BlocksResponse = resp
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(BlockPage {
            blocks: page.blocks,
            next_token: page.next_token,
        })
    }
}
