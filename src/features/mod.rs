//! Numeric feature extraction from the parsed log table.

mod pipeline;

pub use pipeline::FeatureExtractor;

use ndarray::{Array2, ArrayView1, ArrayView2};

/// Column order of every feature matrix.
pub const FEATURE_COLUMNS: [&str; 2] = ["size", "status"];

/// `n_rows x 2` matrix of (size, status), row-aligned with the source table.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn new(values: Array2<f64>) -> Self {
        debug_assert_eq!(values.ncols(), FEATURE_COLUMNS.len());
        Self { values }
    }

    /// Build from `(size, status)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        let mut values = Array2::zeros((pairs.len(), FEATURE_COLUMNS.len()));
        for (i, &(size, status)) in pairs.iter().enumerate() {
            values[[i, 0]] = size;
            values[[i, 1]] = status;
        }
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.values.row(i)
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }
}
