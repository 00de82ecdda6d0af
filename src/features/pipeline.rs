//! Feature extraction: log table → (size, status) matrix with nulls filled.

use super::{FeatureMatrix, FEATURE_COLUMNS};
use crate::config::FeaturesConfig;
use crate::parser::LogTable;
use ndarray::Array2;

pub struct FeatureExtractor {
    config: FeaturesConfig,
}

impl FeatureExtractor {
    pub fn new(config: FeaturesConfig) -> Self {
        Self { config }
    }

    /// One matrix row per table row, same order. Null size/status become `missing_value`.
    pub fn extract(&self, table: &LogTable) -> FeatureMatrix {
        let fill = self.config.missing_value;
        let mut values = Array2::zeros((table.len(), FEATURE_COLUMNS.len()));
        for (i, row) in table.rows.iter().enumerate() {
            values[[i, 0]] = row.size.map(|v| v as f64).unwrap_or(fill);
            values[[i, 1]] = row.status.map(|v| v as f64).unwrap_or(fill);
        }
        FeatureMatrix::new(values)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(FeaturesConfig::default())
    }
}
