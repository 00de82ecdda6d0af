//! Anomaly detection model: trait seam, labels, and the isolation forest.

mod forest;

pub use forest::{ForestParams, IsolationForest};

use crate::features::FeatureMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-row verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyLabel {
    Normal,
    Anomaly,
}

impl AnomalyLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyLabel::Normal => "NORMAL",
            AnomalyLabel::Anomaly => "ANOMALY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NORMAL" => Some(AnomalyLabel::Normal),
            "ANOMALY" => Some(AnomalyLabel::Anomaly),
            _ => None,
        }
    }

    pub fn is_anomaly(&self) -> bool {
        matches!(self, AnomalyLabel::Anomaly)
    }
}

impl fmt::Display for AnomalyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("cannot train on an empty feature matrix")]
    EmptyTrainingSet,
    #[error("invalid training parameters: {0}")]
    InvalidParams(String),
    #[error("incompatible model format (magic {magic:?}, version {version})")]
    IncompatibleFormat { magic: [u8; 4], version: u32 },
    #[error("corrupt model: {0}")]
    Corrupt(String),
    #[error("model encoding error: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("model io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A trained, read-only detector. Must be deterministic for a given input.
pub trait AnomalyDetector: Send + Sync {
    /// One label per matrix row, same order.
    fn predict(&self, features: &FeatureMatrix) -> Vec<AnomalyLabel>;

    fn name(&self) -> &str;
}
