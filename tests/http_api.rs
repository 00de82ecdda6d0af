//! End-to-end HTTP scenarios against the router (no network).

mod common;

use access_sentinel::{
    features::{FeatureExtractor, FeatureMatrix},
    model::{AnomalyDetector, AnomalyLabel},
    scoring::ScoringEngine,
    service::{router, PipelineService},
    storage::CsvResultsStore,
};
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use common::{trained_forest, SAMPLE_LINE};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "sentinel-test-boundary";

struct TestApp {
    app: Router,
    results_path: PathBuf,
    _dir: tempfile::TempDir,
}

fn test_app() -> TestApp {
    test_app_with(Arc::new(trained_forest()))
}

fn test_app_with(detector: Arc<dyn AnomalyDetector>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let results_path = dir.path().join("anomaly_results.csv");
    let store = Arc::new(CsvResultsStore::new(&results_path));
    let scoring = ScoringEngine::new(FeatureExtractor::default(), detector);
    let service = Arc::new(PipelineService::new(scoring, store, Some(dir.path().join("uploads"))));
    TestApp {
        app: router(service, 1024 * 1024),
        results_path,
        _dir: dir,
    }
}

fn multipart_request(field: &str, filename: Option<&str>, content: &str) -> Request<Body> {
    let disposition = match filename {
        Some(name) => format!("form-data; name=\"{field}\"; filename=\"{name}\""),
        None => format!("form-data; name=\"{field}\""),
    };
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: {disposition}\r\nContent-Type: text/plain\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn assert_no_artifact(path: &Path) {
    assert!(!path.exists(), "results artifact should not exist at {}", path.display());
}

#[tokio::test]
async fn upload_single_line_then_fetch_results() {
    let t = test_app();
    let (status, body) = send(&t.app, multipart_request("file", Some("access.log"), SAMPLE_LINE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "File uploaded and processed successfully.");
    assert!(t.results_path.exists());

    let (status, body) = send(&t.app, get("/api/results")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["ip"], "127.0.0.1");
    assert_eq!(rows[0]["status"], 200);
    assert_eq!(rows[0]["size"], 512);
    assert_eq!(rows[0]["timestamp"], "2020-10-10T13:55:36+00:00");
    assert!(rows[0]["anomaly"] == "NORMAL" || rows[0]["anomaly"] == "ANOMALY");
}

#[tokio::test]
async fn upload_empty_file_yields_empty_results() {
    let t = test_app();
    let (status, _) = send(&t.app, multipart_request("file", Some("empty.log"), "")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&t.app, get("/api/results")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Array(Vec::new()));
}

#[tokio::test]
async fn results_before_any_upload_is_not_found() {
    let t = test_app();
    let (status, body) = send(&t.app, get("/api/results")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No results available");
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let t = test_app();
    let (status, body) = send(&t.app, multipart_request("attachment", Some("access.log"), SAMPLE_LINE)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");

    // A plain form field named `file` is not a file part.
    let (status, body) = send(&t.app, multipart_request("file", None, SAMPLE_LINE)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");

    let not_multipart = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .body(Body::from(SAMPLE_LINE))
        .unwrap();
    let (status, body) = send(&t.app, not_multipart).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");

    assert_no_artifact(&t.results_path);
}

#[tokio::test]
async fn upload_with_empty_filename_is_rejected() {
    let t = test_app();
    let (status, body) = send(&t.app, multipart_request("file", Some(""), SAMPLE_LINE)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file selected");
    assert_no_artifact(&t.results_path);
}

#[tokio::test]
async fn rejected_upload_keeps_previous_results() {
    let t = test_app();
    let (status, _) = send(&t.app, multipart_request("file", Some("a.log"), SAMPLE_LINE)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&t.app, multipart_request("other", Some("b.log"), "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&t.app, get("/api/results")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn each_upload_replaces_previous_results() {
    let t = test_app();
    let two = format!("{SAMPLE_LINE}\n{}\nnot a log line\n", common::log_line("8.8.8.8", 404, 0));
    let (status, _) = send(&t.app, multipart_request("file", Some("two.log"), &two)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&t.app, get("/api/results")).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["ip"], "8.8.8.8");

    let (status, _) = send(&t.app, multipart_request("file", Some("one.log"), SAMPLE_LINE)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&t.app, get("/api/results")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

/// Returns a single label regardless of input size.
struct OneLabel;

impl AnomalyDetector for OneLabel {
    fn predict(&self, _features: &FeatureMatrix) -> Vec<AnomalyLabel> {
        vec![AnomalyLabel::Normal]
    }

    fn name(&self) -> &str {
        "one_label"
    }
}

#[tokio::test]
async fn scoring_failure_is_server_error_and_keeps_results() {
    let t = test_app_with(Arc::new(OneLabel));
    let (status, _) = send(&t.app, multipart_request("file", Some("one.log"), SAMPLE_LINE)).await;
    assert_eq!(status, StatusCode::OK);

    let two = format!("{SAMPLE_LINE}\n{}\n", common::log_line("8.8.8.8", 404, 0));
    let (status, body) = send(&t.app, multipart_request("file", Some("two.log"), &two)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to process request");

    let (_, body) = send(&t.app, get("/api/results")).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["ip"], "127.0.0.1");
}

#[tokio::test]
async fn health_reports_ok() {
    let t = test_app();
    let (status, body) = send(&t.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
