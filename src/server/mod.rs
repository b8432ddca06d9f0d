//! Web server exposing the extraction pipeline.
//!
//! A single upload endpoint accepts a PDF resume, runs it through the
//! pipeline, and returns the extracted keywords as JSON. All external
//! services are constructed here and injected into the pipeline as trait
//! objects so tests can substitute fakes.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::clients::{HttpEntityDetector, HttpObjectStore, HttpTextDetector};
use crate::config::Settings;
use crate::services::ExtractionPipeline;
use crate::telemetry::{MlflowRecorder, NoopRecorder, RunRecorder};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub pipeline: Arc<ExtractionPipeline>,
}

/// Wire the HTTP service clients and recorder into a pipeline.
pub fn build_pipeline(settings: &Arc<Settings>) -> Arc<ExtractionPipeline> {
    let recorder: Arc<dyn RunRecorder> = match &settings.tracking_endpoint {
        Some(endpoint) => {
            tracing::info!(endpoint = %endpoint, "experiment tracking enabled");
            Arc::new(MlflowRecorder::new(endpoint, &settings.experiment_name))
        }
        None => Arc::new(NoopRecorder),
    };

    Arc::new(ExtractionPipeline::new(
        settings.clone(),
        Arc::new(HttpObjectStore::new(&settings.object_store_endpoint)),
        Arc::new(HttpTextDetector::new(&settings.ocr_endpoint)),
        Arc::new(HttpEntityDetector::new(&settings.ner_endpoint)),
        recorder,
    ))
}

/// Start the web server.
pub async fn serve(settings: Arc<Settings>, host: &str, port: u16) -> anyhow::Result<()> {
    let pipeline = build_pipeline(&settings);
    let state = AppState { settings, pipeline };
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
