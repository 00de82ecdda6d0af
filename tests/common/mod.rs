//! Shared fixtures for integration tests.
#![allow(dead_code)]

use access_sentinel::features::FeatureMatrix;
use access_sentinel::model::{ForestParams, IsolationForest};

pub const SAMPLE_LINE: &str =
    r#"127.0.0.1 - - [10/Oct/2020:13:55:36 +0000] "GET /index.html HTTP/1.1" 200 512 "-" "Mozilla/5.0""#;

/// Access log line with the given status and size.
pub fn log_line(ip: &str, status: u32, size: u64) -> String {
    format!(
        r#"{ip} - - [10/Oct/2020:13:55:36 +0000] "GET /page HTTP/1.1" {status} {size} "http://example.com/" "Mozilla/5.0 (X11; Linux x86_64)""#
    )
}

/// 500 dense rows (size 500..1000, status 200) plus two far-away outliers.
pub fn training_matrix() -> FeatureMatrix {
    let mut pairs: Vec<(f64, f64)> = (0..500).map(|i| (500.0 + i as f64, 200.0)).collect();
    pairs.push((10_000_000.0, 500.0));
    pairs.push((8_000_000.0, 404.0));
    FeatureMatrix::from_pairs(&pairs)
}

pub fn test_params() -> ForestParams {
    ForestParams {
        n_estimators: 100,
        contamination: 0.01,
        max_samples: 512,
        seed: 42,
    }
}

pub fn trained_forest() -> IsolationForest {
    IsolationForest::fit(&training_matrix(), &test_params()).unwrap()
}
