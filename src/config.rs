//! Service configuration. Loaded once at startup from a JSON file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Path to the trained isolation forest (bincode blob)
    pub model_path: PathBuf,
    /// HTTP listener
    pub server: ServerConfig,
    /// Where a sanitised copy of each upload is kept; `None` disables it
    pub upload_dir: Option<PathBuf>,
    /// Results artifact backend
    pub storage: StorageConfig,
    /// Feature extraction parameters
    pub features: FeaturesConfig,
    /// Offline training hyperparameters
    pub training: TrainingConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Upper bound on a multipart upload body
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Csv,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Substituted for a null size or status
    pub missing_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of isolation trees
    pub n_estimators: usize,
    /// Expected fraction of anomalies in the training set (0.0–0.5]
    pub contamination: f64,
    /// Rows sampled per tree (capped at the training set size)
    pub max_samples: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model/anomaly_detection_model.bin"),
            server: ServerConfig::default(),
            upload_dir: Some(PathBuf::from("logs/uploads")),
            storage: StorageConfig::default(),
            features: FeaturesConfig::default(),
            training: TrainingConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            max_upload_bytes: 256 * 1024 * 1024,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Csv,
            path: PathBuf::from("logs/anomaly_results.csv"),
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self { missing_value: 0.0 }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            contamination: 0.01,
            max_samples: 256,
            seed: 42,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl ServiceConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                if let Ok(c) = serde_json::from_str::<ServiceConfig>(&data) {
                    return c;
                }
            }
        }
        Self::default()
    }

    /// Config path from `ACCESS_SENTINEL_CONFIG`, falling back to `config.json`
    pub fn path_from_env() -> PathBuf {
        std::env::var("ACCESS_SENTINEL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.json"))
    }
}
