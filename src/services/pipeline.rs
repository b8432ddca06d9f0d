//! End-to-end extraction pipeline.
//!
//! Drives one request through upload, text detection, extraction, matching,
//! entity merging, and telemetry, in strict sequence. External services are
//! reached only through their traits; no component here calls another
//! except through this coordinator.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::clients::{EntityDetector, ObjectStore, TextDetector};
use crate::config::Settings;
use crate::error::PipelineError;
use crate::models::{ExtractionResult, NamedEntity, OcrBlock};
use crate::storage::object_key;
use crate::telemetry::RunRecorder;

use super::extract::{
    extract_line_text, match_skills, merge_keywords, normalize_entities, truncate_chars,
};
use super::poll::{poll_job, PollConfig};

/// Coordinates one extraction request at a time; shared across requests
/// behind `Arc`, holding only read-only settings and service handles.
pub struct ExtractionPipeline {
    settings: Arc<Settings>,
    store: Arc<dyn ObjectStore>,
    detector: Arc<dyn TextDetector>,
    entities: Arc<dyn EntityDetector>,
    recorder: Arc<dyn RunRecorder>,
}

/// Tracking-run handle that swallows recorder failures.
///
/// Telemetry must never fail a request that produced a result, so every
/// recording error is logged and dropped. When the run could not be opened
/// at all, every call is a no-op.
struct RunHandle<'a> {
    recorder: &'a dyn RunRecorder,
    run_id: Option<String>,
}

impl RunHandle<'_> {
    async fn param(&self, key: &str, value: &str) {
        if let Some(id) = &self.run_id {
            if let Err(e) = self.recorder.log_param(id, key, value).await {
                warn!(key, error = %e, "failed to record run parameter");
            }
        }
    }

    async fn metric(&self, key: &str, value: f64) {
        if let Some(id) = &self.run_id {
            if let Err(e) = self.recorder.log_metric(id, key, value).await {
                warn!(key, error = %e, "failed to record run metric");
            }
        }
    }

    async fn artifact(&self, path: &std::path::Path, dir: &str) {
        if let Some(id) = &self.run_id {
            if let Err(e) = self.recorder.log_artifact(id, path, dir).await {
                warn!(path = %path.display(), error = %e, "failed to record run artifact");
            }
        }
    }

    async fn finish(&self, success: bool) {
        if let Some(id) = &self.run_id {
            if let Err(e) = self.recorder.end_run(id, success).await {
                warn!(error = %e, "failed to close tracking run");
            }
        }
    }
}

impl ExtractionPipeline {
    pub fn new(
        settings: Arc<Settings>,
        store: Arc<dyn ObjectStore>,
        detector: Arc<dyn TextDetector>,
        entities: Arc<dyn EntityDetector>,
        recorder: Arc<dyn RunRecorder>,
    ) -> Self {
        Self {
            settings,
            store,
            detector,
            entities,
            recorder,
        }
    }

    /// Run one document end to end and record the run.
    pub async fn run(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<ExtractionResult, PipelineError> {
        let run_name = format!("api_upload_{}", filename);
        let run_id = match self.recorder.start_run(&run_name).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "failed to start tracking run");
                None
            }
        };
        let run = RunHandle {
            recorder: self.recorder.as_ref(),
            run_id,
        };

        let outcome = self.execute(&run, filename, bytes).await;

        match &outcome {
            Ok(result) => {
                run.metric("text_length_chars", result.text.chars().count() as f64)
                    .await;
                run.metric("num_ocr_blocks", result.block_count as f64).await;
                run.metric("num_rule_based_skills", result.matched_skills.len() as f64)
                    .await;
                run.metric("num_entities", result.entities.len() as f64).await;
                run.metric(
                    "num_combined_keywords",
                    result.combined_keywords.len() as f64,
                )
                .await;
                run.metric("status", 1.0).await;
                self.stage_artifacts(&run, result).await;
                run.finish(true).await;
            }
            Err(e) => {
                error!(error = %e, "pipeline run failed");
                run.metric("status", 0.0).await;
                run.finish(false).await;
            }
        }

        outcome
    }

    /// Steps 1-6: upload through keyword merging. Telemetry happens in
    /// `run` so failure metrics are recorded on every abort path.
    async fn execute(
        &self,
        run: &RunHandle<'_>,
        filename: &str,
        bytes: &[u8],
    ) -> Result<ExtractionResult, PipelineError> {
        let bucket = self.settings.bucket.clone();
        let key = object_key(filename);

        run.param("source", "api_upload").await;
        run.param("original_filename", filename).await;
        run.param("storage_bucket", &bucket).await;
        run.param("storage_key", &key).await;

        info!(bucket = %bucket, key = %key, "storing uploaded document");
        self.store.put(&bucket, &key, bytes).await.map_err(|e| {
            error!(bucket = %bucket, key = %key, error = %e, "upload failed");
            PipelineError::Storage(e.to_string())
        })?;

        let job_id = self.detector.submit(&bucket, &key).await.map_err(|e| {
            error!(key = %key, error = %e, "job submission failed");
            PipelineError::JobSubmission(e.to_string())
        })?;
        run.param("job_id", &job_id).await;

        poll_job(
            self.detector.as_ref(),
            &job_id,
            PollConfig::new(self.settings.poll_interval(), self.settings.poll_timeout()),
        )
        .await?;

        let blocks = self.fetch_all_blocks(&job_id).await?;

        let text = extract_line_text(&blocks)?;
        let matched = match_skills(&text, &self.settings.skill_vocabulary);

        let entities = self.detect_entities(&text).await;
        let retained = normalize_entities(&entities, &self.settings.excluded_categories);
        let combined = merge_keywords(&matched, &retained);

        let mut matched_skills: Vec<String> = matched.into_iter().collect();
        matched_skills.sort();
        let mut combined_keywords: Vec<String> = combined.into_iter().collect();
        combined_keywords.sort();

        info!(
            job_id = %job_id,
            skills = matched_skills.len(),
            keywords = combined_keywords.len(),
            "extraction complete"
        );

        Ok(ExtractionResult {
            bucket,
            key,
            job_id,
            text,
            block_count: blocks.len(),
            matched_skills,
            entities,
            combined_keywords,
        })
    }

    /// Fetch every result page for a finished job, following continuation
    /// tokens until none remains.
    async fn fetch_all_blocks(&self, job_id: &str) -> Result<Vec<OcrBlock>, PipelineError> {
        let mut all_blocks = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .detector
                .blocks(job_id, next_token.as_deref())
                .await
                .map_err(|e| {
                    error!(job_id, error = %e, "result fetch failed");
                    PipelineError::ResultFetch(e.to_string())
                })?;

            all_blocks.extend(page.blocks);

            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        if all_blocks.is_empty() {
            return Err(PipelineError::ResultFetch(format!(
                "job {} returned no blocks",
                job_id
            )));
        }

        Ok(all_blocks)
    }

    /// Entity detection is best-effort: failures degrade to an empty list
    /// and the pipeline continues.
    async fn detect_entities(&self, text: &str) -> Vec<NamedEntity> {
        if text.is_empty() {
            return Vec::new();
        }

        let bounded = truncate_chars(text, self.settings.ner_max_chars);
        match self
            .entities
            .detect(bounded, &self.settings.ner_language)
            .await
        {
            Ok(entities) => entities,
            Err(e) => {
                warn!(error = %e, "entity detection failed, continuing without entities");
                Vec::new()
            }
        }
    }

    /// Stage the two result artifacts in a temp directory and hand them to
    /// the recorder. The directory is removed on every exit path.
    async fn stage_artifacts(&self, run: &RunHandle<'_>, result: &ExtractionResult) {
        let staging = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                warn!(error = %e, "could not create artifact staging directory");
                return;
            }
        };

        let keywords_path = staging.path().join("combined_keywords.json");
        match serde_json::to_vec_pretty(&result.combined_keywords) {
            Ok(json) => match std::fs::write(&keywords_path, json) {
                Ok(()) => run.artifact(&keywords_path, "results").await,
                Err(e) => warn!(error = %e, "could not stage keyword artifact"),
            },
            Err(e) => warn!(error = %e, "could not serialize keyword artifact"),
        }

        let text_path = staging.path().join("extracted_text.txt");
        match std::fs::write(&text_path, &result.text) {
            Ok(()) => run.artifact(&text_path, "results").await,
            Err(e) => warn!(error = %e, "could not stage text artifact"),
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::clients::BlockPage;
    use crate::models::{JobOutcome, JobStatus, NamedEntity, OcrBlock};

    use super::test_support::*;
    use super::*;

    fn test_settings() -> Settings {
        Settings {
            skill_vocabulary: vec!["python".into(), "aws".into(), "lambda".into()],
            poll_interval_secs: 0,
            poll_timeout_secs: 5,
            ..Settings::default()
        }
    }

    fn pipeline(
        settings: Settings,
        store: Arc<FakeStore>,
        detector: Arc<FakeDetector>,
        entities: Arc<FakeEntities>,
        recorder: Arc<RecorderSpy>,
    ) -> ExtractionPipeline {
        ExtractionPipeline::new(Arc::new(settings), store, detector, entities, recorder)
    }

    #[tokio::test]
    async fn full_run_matches_and_merges() {
        let store = Arc::new(FakeStore::default());
        let detector = Arc::new(FakeDetector::with_lines(&[
            "Experienced with Python and AWS Lambda.",
        ]));
        let entities = Arc::new(FakeEntities::returning(vec![
            NamedEntity {
                text: "John Smith".to_string(),
                category: "PERSON".to_string(),
            },
            NamedEntity {
                text: "Docker".to_string(),
                category: "OTHER".to_string(),
            },
        ]));
        let recorder = Arc::new(RecorderSpy::default());

        let p = pipeline(
            test_settings(),
            store.clone(),
            detector.clone(),
            entities.clone(),
            recorder.clone(),
        );
        let result = p.run("resume.pdf", b"%PDF-1.4").await.unwrap();

        assert_eq!(result.matched_skills, vec!["aws", "lambda", "python"]);
        assert_eq!(
            result.combined_keywords,
            vec!["aws", "docker", "lambda", "python"]
        );
        assert_eq!(result.entities.len(), 2);
        assert_eq!(result.job_id, "job-42");
        assert!(result.key.starts_with("uploads/"));
        assert_eq!(store.put_count(), 1);

        assert_eq!(recorder.metric("status"), Some(1.0));
        assert_eq!(recorder.metric("num_rule_based_skills"), Some(3.0));
        assert_eq!(recorder.metric("num_combined_keywords"), Some(4.0));
        assert_eq!(recorder.param("source"), Some("api_upload".to_string()));
        assert_eq!(recorder.param("job_id"), Some("job-42".to_string()));
        assert_eq!(*recorder.ended.lock().unwrap(), Some(true));

        let artifacts = recorder.artifacts.lock().unwrap();
        assert!(artifacts.contains(&"combined_keywords.json".to_string()));
        assert!(artifacts.contains(&"extracted_text.txt".to_string()));
    }

    #[tokio::test]
    async fn empty_document_still_succeeds() {
        // The job succeeded and returned structural blocks only; the
        // document just has no text.
        let page = BlockPage {
            blocks: vec![OcrBlock {
                block_type: "page".to_string(),
                text: None,
            }],
            next_token: None,
        };
        let store = Arc::new(FakeStore::default());
        let detector = Arc::new(FakeDetector::succeeding(vec![page]));
        let entities = Arc::new(FakeEntities::default());
        let recorder = Arc::new(RecorderSpy::default());

        let p = pipeline(
            test_settings(),
            store,
            detector,
            entities.clone(),
            recorder.clone(),
        );
        let result = p.run("resume.pdf", b"%PDF-1.4").await.unwrap();

        assert_eq!(result.text, "");
        assert!(result.matched_skills.is_empty());
        assert!(result.combined_keywords.is_empty());
        // Empty text never reaches the entity service.
        assert_eq!(entities.call_count(), 0);
        assert_eq!(recorder.metric("status"), Some(1.0));
    }

    #[tokio::test]
    async fn entity_detection_failure_is_downgraded() {
        let store = Arc::new(FakeStore::default());
        let detector = Arc::new(FakeDetector::with_lines(&["Knows Python well."]));
        let entities = Arc::new(FakeEntities::failing());
        let recorder = Arc::new(RecorderSpy::default());

        let p = pipeline(
            test_settings(),
            store,
            detector,
            entities.clone(),
            recorder.clone(),
        );
        let result = p.run("resume.pdf", b"%PDF-1.4").await.unwrap();

        assert_eq!(entities.call_count(), 1);
        assert!(result.entities.is_empty());
        assert_eq!(result.combined_keywords, vec!["python"]);
        assert_eq!(recorder.metric("status"), Some(1.0));
        assert_eq!(recorder.metric("num_entities"), Some(0.0));
    }

    #[tokio::test]
    async fn storage_failure_aborts_before_submission() {
        let store = Arc::new(FakeStore::failing());
        let detector = Arc::new(FakeDetector::with_lines(&["text"]));
        let entities = Arc::new(FakeEntities::default());
        let recorder = Arc::new(RecorderSpy::default());

        let p = pipeline(
            test_settings(),
            store,
            detector.clone(),
            entities,
            recorder.clone(),
        );
        let err = p.run("resume.pdf", b"%PDF-1.4").await.unwrap_err();

        assert!(matches!(err, PipelineError::Storage(_)));
        assert_eq!(detector.submit_count(), 0);
        assert_eq!(recorder.metric("status"), Some(0.0));
        assert_eq!(*recorder.ended.lock().unwrap(), Some(false));
    }

    #[tokio::test]
    async fn failed_job_aborts_with_outcome() {
        let store = Arc::new(FakeStore::default());
        let detector = Arc::new(FakeDetector::scripted(
            vec![JobStatus::Pending, JobStatus::Failed],
            Vec::new(),
        ));
        let entities = Arc::new(FakeEntities::default());
        let recorder = Arc::new(RecorderSpy::default());

        let p = pipeline(test_settings(), store, detector, entities, recorder.clone());
        let err = p.run("resume.pdf", b"%PDF-1.4").await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::JobFailed {
                outcome: JobOutcome::Failed,
                ..
            }
        ));
        assert_eq!(recorder.metric("status"), Some(0.0));
    }

    #[tokio::test]
    async fn no_blocks_is_a_result_fetch_error() {
        let store = Arc::new(FakeStore::default());
        let detector = Arc::new(FakeDetector::succeeding(vec![BlockPage {
            blocks: Vec::new(),
            next_token: None,
        }]));
        let entities = Arc::new(FakeEntities::default());
        let recorder = Arc::new(RecorderSpy::default());

        let p = pipeline(test_settings(), store, detector, entities, recorder);
        let err = p.run("resume.pdf", b"%PDF-1.4").await.unwrap_err();
        assert!(matches!(err, PipelineError::ResultFetch(_)));
    }

    #[tokio::test]
    async fn paginated_results_are_concatenated() {
        let pages = vec![
            BlockPage {
                blocks: vec![OcrBlock::line("uses python daily")],
                next_token: Some("page-2".to_string()),
            },
            BlockPage {
                blocks: vec![OcrBlock::line("and aws in production")],
                next_token: None,
            },
        ];
        let store = Arc::new(FakeStore::default());
        let detector = Arc::new(FakeDetector::succeeding(pages));
        let entities = Arc::new(FakeEntities::default());
        let recorder = Arc::new(RecorderSpy::default());

        let p = pipeline(
            test_settings(),
            store,
            detector.clone(),
            entities,
            recorder,
        );
        let result = p.run("resume.pdf", b"%PDF-1.4").await.unwrap();

        assert_eq!(result.text, "uses python daily\nand aws in production");
        assert_eq!(result.block_count, 2);
        assert_eq!(
            detector.page_fetches.load(std::sync::atomic::Ordering::SeqCst),
            2
        );
        assert_eq!(result.matched_skills, vec!["aws", "python"]);
    }

    #[tokio::test]
    async fn malformed_line_block_aborts() {
        let page = BlockPage {
            blocks: vec![OcrBlock {
                block_type: "line".to_string(),
                text: None,
            }],
            next_token: None,
        };
        let store = Arc::new(FakeStore::default());
        let detector = Arc::new(FakeDetector::succeeding(vec![page]));
        let entities = Arc::new(FakeEntities::default());
        let recorder = Arc::new(RecorderSpy::default());

        let p = pipeline(test_settings(), store, detector, entities, recorder.clone());
        let err = p.run("resume.pdf", b"%PDF-1.4").await.unwrap_err();

        assert!(matches!(err, PipelineError::MalformedResponse(_)));
        assert_eq!(recorder.metric("status"), Some(0.0));
    }
}
