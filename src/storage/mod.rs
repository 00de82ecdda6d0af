//! Results artifact storage. Each write replaces the previous artifact entirely.

mod csv;
mod sqlite;

pub use self::csv::{read_rows, write_rows, CsvResultsStore};
pub use self::sqlite::SqliteResultsStore;

use crate::config::{StorageBackend, StorageConfig};
use crate::scoring::AnnotatedResult;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt stored row {row}: {reason}")]
    Corrupt { row: usize, reason: String },
}

/// Single shared results artifact. Writers are serialised; last writer wins.
pub trait ResultsStore: Send + Sync {
    /// Replace the stored artifact with `result`.
    fn write(&self, result: &AnnotatedResult) -> Result<(), StorageError>;

    /// `None` until the first successful write.
    fn read(&self) -> Result<Option<AnnotatedResult>, StorageError>;
}

/// Open the configured backend, creating parent directories as needed.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn ResultsStore>, StorageError> {
    if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let store: Arc<dyn ResultsStore> = match config.backend {
        StorageBackend::Csv => Arc::new(CsvResultsStore::new(&config.path)),
        StorageBackend::Sqlite => Arc::new(SqliteResultsStore::open(&config.path)?),
    };
    Ok(store)
}
