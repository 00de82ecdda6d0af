//! access-sentinel — anomaly detection over web-server access logs.
//!
//! Modular structure:
//! - [`parser`] — Access-log line grammar and typed log table
//! - [`features`] — (size, status) feature matrix extraction
//! - [`model`] — Detector trait and isolation forest (train, predict, persist)
//! - [`scoring`] — Labels rows and builds the annotated result
//! - [`storage`] — Results artifact backends (CSV file, SQLite)
//! - [`service`] — Upload pipeline and HTTP API
//! - [`logging`] — Structured JSON logging

pub mod config;
pub mod features;
pub mod logging;
pub mod model;
pub mod parser;
pub mod scoring;
pub mod service;
pub mod storage;

pub use config::ServiceConfig;
pub use features::{FeatureExtractor, FeatureMatrix};
pub use logging::StructuredLogger;
pub use model::{AnomalyDetector, AnomalyLabel, ForestParams, IsolationForest};
pub use parser::{LogTable, LogTableBuilder};
pub use scoring::{AnnotatedResult, ScoringEngine, ScoringError};
pub use service::PipelineService;
pub use storage::ResultsStore;
