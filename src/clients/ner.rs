//! HTTP entity detection (NER) client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::NamedEntity;

use super::{ClientError, EntityDetector};

/// Client for the named entity detection service.
///
/// Callers are responsible for truncating oversized text before submission;
/// the service enforces a maximum payload.
pub struct HttpEntityDetector {
    endpoint: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    text: &'a str,
    language: &'a str,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    entities: Vec<NamedEntity>,
}

impl HttpEntityDetector {
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
impl EntityDetector for HttpEntityDetector {
    async fn detect(&self, text: &str, language: &str) -> Result<Vec<NamedEntity>, ClientError> {
        let url = format!("{}/entities", self.endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&DetectRequest { text, language })
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClientError::Api(format!("HTTP {}", resp.status())));
        }

        let detected: DetectResponse = resp
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(detected.entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_response_defaults_to_no_entities() {
        let parsed: DetectResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.entities.is_empty());
    }

    #[test]
    fn detect_response_parses_entities() {
        let parsed: DetectResponse = serde_json::from_str(
            "{\"entities\":[{\"text\":\"Docker\",\"category\":\"OTHER\"}]}",
        )
        .unwrap();
        assert_eq!(parsed.entities.len(), 1);
        assert_eq!(parsed.entities[0].text, "Docker");
    }
}
