//! HTTP object store client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{ClientError, ObjectStore};

/// Object store client for an S3-compatible HTTP gateway:
/// `PUT {endpoint}/{bucket}/{key}` with the raw object bytes.
pub struct HttpObjectStore {
    endpoint: String,
    client: Client,
}

impl HttpObjectStore {
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
impl ObjectStore for HttpObjectStore {
    async fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<(), ClientError> {
        let url = format!("{}/{}/{}", self.endpoint, bucket, key);
        let resp = self
            .client
            .put(&url)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClientError::Api(format!(
                "HTTP {} storing {}/{}",
                resp.status(),
                bucket,
                key
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let store = HttpObjectStore::new("http://localhost:9000/");
        assert_eq!(store.endpoint, "http://localhost:9000");
    }
}
