//! HTTP endpoint handlers.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::error::PipelineError;
use crate::services::extract::truncate_chars;

use super::AppState;

/// Characters of extracted text echoed back in the response.
const SNIPPET_CHARS: usize = 500;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn pipeline_error_response(err: &PipelineError) -> Response {
    let status = match err {
        PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    };
    error_response(status, err.to_string())
}

/// Accept a PDF resume upload and run it through the extraction pipeline.
///
/// The upload is validated before any external service is touched: the
/// multipart field must be named `resume`, carry a filename, and have a
/// `.pdf` extension.
pub async fn parse_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let mut upload: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Malformed upload: {}", e),
                )
            }
        };

        if field.name() != Some("resume") {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Could not read upload: {}", e),
                )
            }
        };
        upload = Some((filename, bytes));
        break;
    }

    let Some((filename, bytes)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "No file part in the request");
    };

    if filename.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No file selected for uploading");
    }

    if !filename.to_lowercase().ends_with(".pdf") {
        return error_response(StatusCode::BAD_REQUEST, "Only PDF files are allowed");
    }

    match state.pipeline.run(&filename, &bytes).await {
        Ok(result) => {
            let snippet = format!("{}...", truncate_chars(&result.text, SNIPPET_CHARS));
            Json(json!({
                "storage_path": result.storage_path(),
                "job_id": result.job_id,
                "combined_keywords": result.combined_keywords,
                "matched_skills": result.matched_skills,
                "entities": result.entities,
                "text_snippet": snippet,
            }))
            .into_response()
        }
        Err(e) => {
            warn!(filename = %filename, error = %e, "resume processing failed");
            pipeline_error_response(&e)
        }
    }
}
