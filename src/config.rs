//! Configuration management for Skillscan.
//!
//! Settings come from an optional TOML file, with a handful of environment
//! overrides for the values that differ between deployments (endpoints,
//! bucket, tracking server). The skill vocabulary and the entity category
//! exclusion set are loaded here once at startup and never mutated; the
//! matcher and normalizer receive them as plain borrows.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default poll interval for text detection jobs, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default total poll timeout for text detection jobs, in seconds.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 300;

/// Upload size limit (16 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// The entity detection service rejects oversized payloads; text is
/// truncated to this many characters before submission.
pub const DEFAULT_NER_MAX_CHARS: usize = 4900;

/// Process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Object store gateway endpoint.
    #[serde(default = "default_object_store_endpoint")]
    pub object_store_endpoint: String,

    /// Bucket uploaded resumes are stored in.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Text detection (OCR) service endpoint.
    #[serde(default = "default_ocr_endpoint")]
    pub ocr_endpoint: String,

    /// Entity detection (NER) service endpoint.
    #[serde(default = "default_ner_endpoint")]
    pub ner_endpoint: String,

    /// Experiment tracking server endpoint. Absent means runs are not
    /// recorded anywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_endpoint: Option<String>,

    /// Experiment name runs are grouped under on the tracking server.
    #[serde(default = "default_experiment_name")]
    pub experiment_name: String,

    /// Seconds between job status polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Total seconds before an unfinished job counts as timed out.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Language code sent to the entity detection service.
    #[serde(default = "default_ner_language")]
    pub ner_language: String,

    /// Maximum characters of text submitted for entity detection.
    #[serde(default = "default_ner_max_chars")]
    pub ner_max_chars: usize,

    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Lowercase skill terms matched against extracted text.
    #[serde(default = "default_skill_vocabulary")]
    pub skill_vocabulary: Vec<String>,

    /// Entity categories dropped during normalization.
    #[serde(default = "default_excluded_categories")]
    pub excluded_categories: HashSet<String>,
}

fn default_object_store_endpoint() -> String {
    "http://localhost:9000".to_string()
}
fn default_bucket() -> String {
    "resume-uploads".to_string()
}
fn default_ocr_endpoint() -> String {
    "http://localhost:8081".to_string()
}
fn default_ner_endpoint() -> String {
    "http://localhost:8082".to_string()
}
fn default_experiment_name() -> String {
    "resume_processing_api_v1".to_string()
}
fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_poll_timeout_secs() -> u64 {
    DEFAULT_POLL_TIMEOUT_SECS
}
fn default_ner_language() -> String {
    "en".to_string()
}
fn default_ner_max_chars() -> usize {
    DEFAULT_NER_MAX_CHARS
}
fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_skill_vocabulary() -> Vec<String> {
    [
        "python",
        "java",
        "c++",
        "sql",
        "aws",
        "azure",
        "gcp",
        "s3",
        "ec2",
        "lambda",
        "react",
        "angular",
        "vue",
        "django",
        "flask",
        "machine learning",
        "data science",
        "pandas",
        "numpy",
        "scikit-learn",
        "tensorflow",
        "pytorch",
        "docker",
        "kubernetes",
        "git",
        "ci/cd",
        "agile",
        "airflow",
        "mlflow",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_excluded_categories() -> HashSet<String> {
    ["PERSON", "LOCATION", "DATE", "ORGANIZATION", "QUANTITY"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            object_store_endpoint: default_object_store_endpoint(),
            bucket: default_bucket(),
            ocr_endpoint: default_ocr_endpoint(),
            ner_endpoint: default_ner_endpoint(),
            tracking_endpoint: None,
            experiment_name: default_experiment_name(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
            ner_language: default_ner_language(),
            ner_max_chars: default_ner_max_chars(),
            max_upload_bytes: default_max_upload_bytes(),
            skill_vocabulary: default_skill_vocabulary(),
            excluded_categories: default_excluded_categories(),
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file, then apply environment
    /// overrides. A missing file yields defaults; an unreadable or invalid
    /// file is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = match path {
            Some(p) if p.exists() => {
                let raw = fs::read_to_string(p)?;
                toml::from_str(&raw)?
            }
            Some(p) => {
                anyhow::bail!("config file not found: {}", p.display());
            }
            None => Self::default(),
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Apply environment variable overrides for deployment-specific values.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SKILLSCAN_OBJECT_STORE_ENDPOINT") {
            self.object_store_endpoint = v;
        }
        if let Ok(v) = std::env::var("SKILLSCAN_BUCKET") {
            self.bucket = v;
        }
        if let Ok(v) = std::env::var("SKILLSCAN_OCR_ENDPOINT") {
            self.ocr_endpoint = v;
        }
        if let Ok(v) = std::env::var("SKILLSCAN_NER_ENDPOINT") {
            self.ner_endpoint = v;
        }
        if let Ok(v) = std::env::var("MLFLOW_TRACKING_URI") {
            if !v.is_empty() {
                self.tracking_endpoint = Some(v);
            }
        }
    }

    /// Poll interval as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Poll timeout as a `Duration`.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_include_original_vocabulary() {
        let settings = Settings::default();
        assert!(settings.skill_vocabulary.iter().any(|s| s == "python"));
        assert!(settings
            .skill_vocabulary
            .iter()
            .any(|s| s == "machine learning"));
        assert!(settings.excluded_categories.contains("PERSON"));
        assert!(!settings.excluded_categories.contains("OTHER"));
    }

    #[test]
    fn defaults_are_lowercase_terms() {
        for term in Settings::default().skill_vocabulary {
            assert_eq!(term, term.to_lowercase());
        }
    }

    #[test]
    fn load_missing_path_fails() {
        let err = Settings::load(Some(Path::new("/nonexistent/skillscan.toml")));
        assert!(err.is_err());
    }

    #[test]
    fn load_partial_toml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skillscan.toml");
        fs::write(
            &path,
            "bucket = \"custom-bucket\"\npoll_interval_secs = 1\n",
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.bucket, "custom-bucket");
        assert_eq!(settings.poll_interval(), Duration::from_secs(1));
        assert_eq!(settings.poll_timeout(), Duration::from_secs(300));
        assert!(!settings.skill_vocabulary.is_empty());
    }

    #[test]
    fn vocabulary_overridable_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skillscan.toml");
        fs::write(&path, "skill_vocabulary = [\"rust\", \"tokio\"]\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.skill_vocabulary, vec!["rust", "tokio"]);
    }
}
