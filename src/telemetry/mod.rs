//! Experiment tracking for pipeline runs.
//!
//! Every pipeline invocation is recorded as one tracked run: parameters
//! first, metrics and artifacts as they become available, then the run is
//! closed. The shipped implementation speaks the MLflow REST surface; when
//! no tracking endpoint is configured the recorder degrades to a no-op so
//! requests are never blocked on telemetry.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::clients::ClientError;

/// Records one tracked run per pipeline invocation.
#[async_trait]
pub trait RunRecorder: Send + Sync {
    /// Open a run; the returned id is passed to every subsequent call.
    async fn start_run(&self, run_name: &str) -> Result<String, ClientError>;

    async fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<(), ClientError>;

    async fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<(), ClientError>;

    /// Upload a staged local file under the run's artifact folder.
    async fn log_artifact(
        &self,
        run_id: &str,
        local_path: &Path,
        artifact_dir: &str,
    ) -> Result<(), ClientError>;

    /// Close the run as finished or failed.
    async fn end_run(&self, run_id: &str, success: bool) -> Result<(), ClientError>;
}

/// Recorder used when no tracking endpoint is configured.
#[derive(Debug, Default)]
pub struct NoopRecorder;

#[async_trait]
impl RunRecorder for NoopRecorder {
    async fn start_run(&self, _run_name: &str) -> Result<String, ClientError> {
        Ok(String::new())
    }

    async fn log_param(&self, _run_id: &str, _key: &str, _value: &str) -> Result<(), ClientError> {
        Ok(())
    }

    async fn log_metric(&self, _run_id: &str, _key: &str, _value: f64) -> Result<(), ClientError> {
        Ok(())
    }

    async fn log_artifact(
        &self,
        _run_id: &str,
        _local_path: &Path,
        _artifact_dir: &str,
    ) -> Result<(), ClientError> {
        Ok(())
    }

    async fn end_run(&self, _run_id: &str, _success: bool) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Recorder speaking the MLflow tracking REST API.
///
/// The experiment is resolved by name once and cached for the process
/// lifetime; it is created on first use if the server does not know it.
pub struct MlflowRecorder {
    endpoint: String,
    experiment_name: String,
    client: Client,
    experiment_id: OnceCell<String>,
}

impl MlflowRecorder {
    pub fn new(endpoint: &str, experiment_name: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            experiment_name: experiment_name.to_string(),
            client,
            experiment_id: OnceCell::new(),
        }
    }

    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, ClientError> {
        let url = format!("{}/api/2.0/mlflow/{}", self.endpoint, path);
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClientError::Api(format!("HTTP {} from {}", resp.status(), path)));
        }

        resp.json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// Resolve the experiment id by name, creating the experiment if the
    /// tracking server does not have it yet.
    async fn experiment_id(&self) -> Result<&str, ClientError> {
        let id = self
            .experiment_id
            .get_or_try_init(|| async {
                let url = format!(
                    "{}/api/2.0/mlflow/experiments/get-by-name",
                    self.endpoint
                );
                let resp = self
                    .client
                    .get(&url)
                    .query(&[("experiment_name", self.experiment_name.as_str())])
                    .send()
                    .await
                    .map_err(|e| ClientError::Connection(e.to_string()))?;

                if resp.status() == StatusCode::NOT_FOUND {
                    let created = self
                        .post(
                            "experiments/create",
                            json!({ "name": self.experiment_name }),
                        )
                        .await?;
                    return created["experiment_id"]
                        .as_str()
                        .map(String::from)
                        .ok_or_else(|| {
                            ClientError::Parse("experiment id missing".to_string())
                        });
                }

                if !resp.status().is_success() {
                    return Err(ClientError::Api(format!("HTTP {}", resp.status())));
                }

                let body: serde_json::Value = resp
                    .json()
                    .await
                    .map_err(|e| ClientError::Parse(e.to_string()))?;
                body["experiment"]["experiment_id"]
                    .as_str()
                    .map(String::from)
                    .ok_or_else(|| ClientError::Parse("experiment id missing".to_string()))
            })
            .await?;

        Ok(id.as_str())
    }
}

#[async_trait]
impl RunRecorder for MlflowRecorder {
    async fn start_run(&self, run_name: &str) -> Result<String, ClientError> {
        let experiment_id = self.experiment_id().await?;
        let created = self
            .post(
                "runs/create",
                json!({
                    "experiment_id": experiment_id,
                    "run_name": run_name,
                    "start_time": chrono::Utc::now().timestamp_millis(),
                }),
            )
            .await?;

        let run_id = created["run"]["info"]["run_id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| ClientError::Parse("run id missing".to_string()))?;

        debug!(run_id = %run_id, run_name, "tracking run started");
        Ok(run_id)
    }

    async fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<(), ClientError> {
        self.post(
            "runs/log-parameter",
            json!({ "run_id": run_id, "key": key, "value": value }),
        )
        .await
        .map(|_| ())
    }

    async fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<(), ClientError> {
        self.post(
            "runs/log-metric",
            json!({
                "run_id": run_id,
                "key": key,
                "value": value,
                "timestamp": chrono::Utc::now().timestamp_millis(),
                "step": 0,
            }),
        )
        .await
        .map(|_| ())
    }

    async fn log_artifact(
        &self,
        run_id: &str,
        local_path: &Path,
        artifact_dir: &str,
    ) -> Result<(), ClientError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| ClientError::Api(format!("reading artifact: {}", e)))?;

        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::Api("artifact has no file name".to_string()))?;

        let url = format!(
            "{}/api/2.0/mlflow-artifacts/artifacts/{}/{}/{}",
            self.endpoint, run_id, artifact_dir, file_name
        );
        let resp = self
            .client
            .put(&url)
            .body(bytes)
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClientError::Api(format!("HTTP {}", resp.status())));
        }

        Ok(())
    }

    async fn end_run(&self, run_id: &str, success: bool) -> Result<(), ClientError> {
        let status = if success { "FINISHED" } else { "FAILED" };
        self.post(
            "runs/update",
            json!({
                "run_id": run_id,
                "status": status,
                "end_time": chrono::Utc::now().timestamp_millis(),
            }),
        )
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_recorder_accepts_everything() {
        let recorder = NoopRecorder;
        let run_id = recorder.start_run("test").await.unwrap();
        assert!(run_id.is_empty());
        recorder.log_param(&run_id, "k", "v").await.unwrap();
        recorder.log_metric(&run_id, "m", 1.0).await.unwrap();
        recorder.end_run(&run_id, true).await.unwrap();
    }

    #[test]
    fn mlflow_recorder_trims_endpoint() {
        let recorder = MlflowRecorder::new("http://localhost:5000/", "exp");
        assert_eq!(recorder.endpoint, "http://localhost:5000");
    }
}
