//! Runs the detector over a log table and reattaches labels positionally.

use crate::features::FeatureExtractor;
use crate::model::{AnomalyDetector, AnomalyLabel};
use crate::parser::{LogRow, LogTable};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A log row with its anomaly label appended; the persisted/served record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRow {
    pub ip: String,
    #[serde(with = "crate::parser::rfc3339")]
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub method: String,
    pub url: String,
    pub protocol: String,
    pub status: Option<i64>,
    pub size: Option<i64>,
    pub referer: String,
    pub user_agent: String,
    pub anomaly: AnomalyLabel,
}

impl AnnotatedRow {
    pub const COLUMNS: [&'static str; 10] = [
        "ip",
        "timestamp",
        "method",
        "url",
        "protocol",
        "status",
        "size",
        "referer",
        "user_agent",
        "anomaly",
    ];

    pub fn new(row: LogRow, anomaly: AnomalyLabel) -> Self {
        Self {
            ip: row.ip,
            timestamp: row.timestamp,
            method: row.method,
            url: row.url,
            protocol: row.protocol,
            status: row.status,
            size: row.size,
            referer: row.referer,
            user_agent: row.user_agent,
            anomaly,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotatedResult {
    pub rows: Vec<AnnotatedRow>,
}

impl AnnotatedResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn anomaly_count(&self) -> usize {
        self.rows.iter().filter(|r| r.anomaly.is_anomaly()).count()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("detector {detector} returned {labels} labels for {rows} rows")]
    MisalignedLabels {
        detector: String,
        rows: usize,
        labels: usize,
    },
}

pub struct ScoringEngine {
    extractor: FeatureExtractor,
    detector: Arc<dyn AnomalyDetector>,
}

impl ScoringEngine {
    pub fn new(extractor: FeatureExtractor, detector: Arc<dyn AnomalyDetector>) -> Self {
        Self {
            extractor,
            detector,
        }
    }

    /// Label every row of `table`. Output has exactly one row per input row, in order;
    /// a detector that breaks that contract fails the whole table.
    pub fn score(&self, table: LogTable) -> Result<AnnotatedResult, ScoringError> {
        let features = self.extractor.extract(&table);
        let labels = self.detector.predict(&features);
        if labels.len() != table.len() {
            return Err(ScoringError::MisalignedLabels {
                detector: self.detector.name().to_string(),
                rows: table.len(),
                labels: labels.len(),
            });
        }
        let rows = table
            .rows
            .into_iter()
            .zip(labels)
            .map(|(row, label)| AnnotatedRow::new(row, label))
            .collect();
        Ok(AnnotatedResult { rows })
    }

    pub fn detector(&self) -> &Arc<dyn AnomalyDetector> {
        &self.detector
    }
}
