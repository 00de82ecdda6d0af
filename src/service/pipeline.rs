//! Request-scoped upload pipeline.
//!
//! RECEIVED → PARSED → SCORED → PERSISTED, or RECEIVED → rejected when no file
//! (or an empty filename) was sent. Rejection happens before any side effect.

use crate::parser::LogTableBuilder;
use crate::scoring::{AnnotatedResult, ScoringEngine, ScoringError};
use crate::storage::{ResultsStore, StorageError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const FALLBACK_FILENAME: &str = "upload.log";

/// A file part taken from the request.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub upload_id: Uuid,
    pub rows: usize,
    pub dropped_lines: usize,
    pub anomalies: usize,
    pub saved_as: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No file provided")]
    MissingFile,
    #[error("No file selected")]
    EmptyFilename,
    #[error("failed to save upload: {0}")]
    SaveUpload(#[from] std::io::Error),
    #[error("failed to score upload: {0}")]
    Scoring(#[from] ScoringError),
    #[error("failed to access results: {0}")]
    Storage(#[from] StorageError),
}

impl PipelineError {
    /// Errors caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::MissingFile | PipelineError::EmptyFilename)
    }
}

pub struct PipelineService {
    builder: LogTableBuilder,
    scoring: ScoringEngine,
    store: Arc<dyn ResultsStore>,
    upload_dir: Option<PathBuf>,
}

impl PipelineService {
    pub fn new(scoring: ScoringEngine, store: Arc<dyn ResultsStore>, upload_dir: Option<PathBuf>) -> Self {
        Self {
            builder: LogTableBuilder::new(),
            scoring,
            store,
            upload_dir,
        }
    }

    /// Run one upload through the whole pipeline and overwrite the stored results.
    pub fn handle_upload(&self, upload: Option<Upload>) -> Result<UploadReceipt, PipelineError> {
        let upload = upload.ok_or(PipelineError::MissingFile)?;
        if upload.filename.is_empty() {
            return Err(PipelineError::EmptyFilename);
        }

        let upload_id = Uuid::new_v4();
        let span = tracing::info_span!("upload", %upload_id, filename = %upload.filename);
        let _enter = span.enter();
        info!(bytes = upload.bytes.len(), "received");

        let saved_as = match &self.upload_dir {
            Some(dir) => Some(save_upload(dir, &upload)?),
            None => None,
        };

        let text = String::from_utf8_lossy(&upload.bytes);
        let table = self.builder.build_from_str(&text);
        let dropped_lines = table.dropped_lines;
        info!(rows = table.len(), dropped_lines, "parsed");

        let result = self.scoring.score(table)?;
        let anomalies = result.anomaly_count();
        info!(rows = result.len(), anomalies, "scored");

        self.store.write(&result)?;
        info!("persisted");

        Ok(UploadReceipt {
            upload_id,
            rows: result.len(),
            dropped_lines,
            anomalies,
            saved_as,
        })
    }

    /// The last persisted result, or `None` if nothing was ever written.
    pub fn results(&self) -> Result<Option<AnnotatedResult>, PipelineError> {
        Ok(self.store.read()?)
    }
}

fn save_upload(dir: &Path, upload: &Upload) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(secure_filename(&upload.filename));
    std::fs::write(&path, &upload.bytes)?;
    Ok(path)
}

/// Reduce a client-supplied name to a safe basename of `[A-Za-z0-9._-]`.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or("");
    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let trimmed = cleaned.trim_matches(|c: char| c == '.' || c == '_');
    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}
