//! Isolation forest over the (size, status) feature space.
//!
//! Points that are isolated by few random axis-aligned splits score close to 1.0;
//! points inside dense regions score well below 0.5. The decision threshold is
//! fixed at training time from the contamination rate, so inference is a pure
//! function of the stored trees.

use super::{AnomalyDetector, AnomalyLabel, ModelError};
use crate::config::TrainingConfig;
use crate::features::{FeatureMatrix, FEATURE_COLUMNS};
use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

const MAGIC: [u8; 4] = *b"ASIF";
const FORMAT_VERSION: u32 = 1;
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub contamination: f64,
    pub max_samples: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for ForestParams {
    fn from(c: &TrainingConfig) -> Self {
        Self {
            n_estimators: c.n_estimators,
            contamination: c.contamination,
            max_samples: c.max_samples,
            seed: c.seed,
        }
    }
}

impl ForestParams {
    fn validate(&self) -> Result<(), ModelError> {
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidParams("n_estimators must be >= 1".into()));
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(ModelError::InvalidParams(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        if self.max_samples == 0 {
            return Err(ModelError::InvalidParams("max_samples must be >= 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Arena-backed tree; node 0 is the root and children always follow their parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn fit(data: ArrayView2<'_, f64>, rows: &mut [usize], height_limit: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(data, rows, 0, height_limit, rng);
        tree
    }

    fn grow(
        &mut self,
        data: ArrayView2<'_, f64>,
        rows: &mut [usize],
        depth: usize,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { size: rows.len() });
        if depth >= height_limit || rows.len() <= 1 {
            return idx;
        }

        // Only features that still vary inside this node can split it.
        let candidates: Vec<(usize, f64, f64)> = (0..data.ncols())
            .filter_map(|f| {
                let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                    let v = data[[r, f]];
                    (lo.min(v), hi.max(v))
                });
                (hi > lo).then_some((f, lo, hi))
            })
            .collect();
        if candidates.is_empty() {
            return idx;
        }

        let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(lo..hi);

        let mut split = 0;
        for i in 0..rows.len() {
            if data[[rows[i], feature]] < threshold {
                rows.swap(i, split);
                split += 1;
            }
        }

        let (left_rows, right_rows) = rows.split_at_mut(split);
        let left = self.grow(data, left_rows, depth + 1, height_limit, rng);
        let right = self.grow(data, right_rows, depth + 1, height_limit, rng);
        self.nodes[idx] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        idx
    }

    fn path_length(&self, x: ArrayView1<'_, f64>) -> f64 {
        let mut node = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[*feature] < *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("empty tree".into());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                threshold,
                left,
                right,
            } = node
            {
                if *feature >= n_features || !threshold.is_finite() {
                    return Err(format!("node {i}: bad split"));
                }
                if *left <= i || *right <= i || *left >= self.nodes.len() || *right >= self.nodes.len() {
                    return Err(format!("node {i}: bad child index"));
                }
            }
        }
        Ok(())
    }
}

/// Expected path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated quantile of unsorted values, `q` in [0, 1].
fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    n_features: usize,
    sample_size: usize,
    threshold: f64,
    params: ForestParams,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    magic: [u8; 4],
    version: u32,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    magic: [u8; 4],
    version: u32,
    forest: &'a IsolationForest,
}

#[derive(Deserialize)]
struct Envelope {
    #[allow(dead_code)]
    magic: [u8; 4],
    #[allow(dead_code)]
    version: u32,
    forest: IsolationForest,
}

impl IsolationForest {
    /// Train on every row of `features`. Deterministic for a fixed seed.
    pub fn fit(features: &FeatureMatrix, params: &ForestParams) -> Result<Self, ModelError> {
        params.validate()?;
        if features.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }

        let n = features.len();
        let data = features.view();
        let sample_size = params.max_samples.min(n);
        let height_limit = (sample_size as f64).log2().ceil().max(0.0) as usize;
        let mut rng = StdRng::seed_from_u64(params.seed);

        let trees = (0..params.n_estimators)
            .map(|_| {
                let mut rows = index::sample(&mut rng, n, sample_size).into_vec();
                IsolationTree::fit(data, &mut rows, height_limit, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            n_features: features.n_features(),
            sample_size,
            threshold: 0.0,
            params: params.clone(),
        };
        let scores = forest.score_samples(features);
        forest.threshold = quantile(&scores, 1.0 - params.contamination);
        tracing::debug!(
            trees = forest.trees.len(),
            sample_size,
            threshold = forest.threshold,
            "isolation forest trained"
        );
        Ok(forest)
    }

    /// Anomaly score in (0, 1] per row; higher is more anomalous.
    pub fn score_samples(&self, features: &FeatureMatrix) -> Vec<f64> {
        let norm = average_path_length(self.sample_size).max(1.0);
        (0..features.len())
            .map(|i| {
                let x = features.row(i);
                let mean = self.trees.iter().map(|t| t.path_length(x)).sum::<f64>() / self.trees.len() as f64;
                2f64.powf(-mean / norm)
            })
            .collect()
    }

    /// Score above which a row is labelled an anomaly.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ModelError> {
        Ok(bincode::serialize(&EnvelopeRef {
            magic: MAGIC,
            version: FORMAT_VERSION,
            forest: self,
        })?)
    }

    /// Decode a blob written by [`to_bytes`](Self::to_bytes) of the same format version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let header: EnvelopeHeader = bincode::deserialize(bytes)?;
        if header.magic != MAGIC || header.version != FORMAT_VERSION {
            return Err(ModelError::IncompatibleFormat {
                magic: header.magic,
                version: header.version,
            });
        }
        let forest = bincode::deserialize::<Envelope>(bytes)?.forest;
        forest.validate().map_err(ModelError::Corrupt)?;
        Ok(forest)
    }

    fn validate(&self) -> Result<(), String> {
        if self.n_features != FEATURE_COLUMNS.len() {
            return Err(format!(
                "model expects {} features, extractor produces {}",
                self.n_features,
                FEATURE_COLUMNS.len()
            ));
        }
        if self.sample_size == 0 {
            return Err("sample size is zero".into());
        }
        if !self.threshold.is_finite() {
            return Err(format!("non-finite threshold {}", self.threshold));
        }
        if self.trees.is_empty() {
            return Err("no trees".into());
        }
        self.trees.iter().try_for_each(|tree| tree.validate(self.n_features))
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

impl AnomalyDetector for IsolationForest {
    fn predict(&self, features: &FeatureMatrix) -> Vec<AnomalyLabel> {
        debug_assert_eq!(features.n_features(), self.n_features);
        self.score_samples(features)
            .into_iter()
            .map(|s| {
                if s > self.threshold {
                    AnomalyLabel::Anomaly
                } else {
                    AnomalyLabel::Normal
                }
            })
            .collect()
    }

    fn name(&self) -> &str {
        "isolation_forest"
    }
}
