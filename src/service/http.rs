//! HTTP surface: `POST /api/upload`, `GET /api/results`, `GET /health`.

use super::pipeline::{PipelineError, PipelineService, Upload};
use crate::scoring::AnnotatedResult;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

const FILE_FIELD: &str = "file";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error("No results available")]
    NotFound,
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Pipeline(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Multipart(e) => (e.status(), e.body_text()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Pipeline(_) | ApiError::Internal(_) => {
                error!(error = %self, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to process request".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Build the application router around a shared pipeline.
pub fn router(service: Arc<PipelineService>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/upload", post(upload))
        .route("/api/results", get(results))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn upload(
    State(service): State<Arc<PipelineService>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let file = match multipart {
        Ok(mp) => read_file_field(mp).await?,
        Err(rejection) => {
            debug!(%rejection, "upload is not a multipart request");
            None
        }
    };

    let receipt = tokio::task::spawn_blocking(move || service.handle_upload(file))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    info!(
        upload_id = %receipt.upload_id,
        rows = receipt.rows,
        anomalies = receipt.anomalies,
        "upload processed"
    );

    Ok(Json(json!({ "message": "File uploaded and processed successfully." })))
}

/// First part named `file` that carries a filename; plain form fields don't count.
async fn read_file_field(mut multipart: Multipart) -> Result<Option<Upload>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let bytes = field.bytes().await?;
        return Ok(Some(Upload {
            filename,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

async fn results(State(service): State<Arc<PipelineService>>) -> Result<Json<AnnotatedResult>, ApiError> {
    let stored = tokio::task::spawn_blocking(move || service.results())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    stored.map(Json).ok_or(ApiError::NotFound)
}
