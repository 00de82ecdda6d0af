//! CSV file backend. Writes go to a sibling temp file and are renamed into place.

use super::{ResultsStore, StorageError};
use crate::scoring::{AnnotatedResult, AnnotatedRow};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Write `rows` under a header line of `columns`, replacing `path` atomically.
pub fn write_rows<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> Result<(), StorageError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut writer = ::csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&tmp)?;
    writer.write_record(columns)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    drop(writer);

    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Read every record of a headed CSV file, matching columns by name.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorageError> {
    let mut reader = ::csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for record in reader.deserialize() {
        out.push(record?);
    }
    Ok(out)
}

pub struct CsvResultsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvResultsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultsStore for CsvResultsStore {
    fn write(&self, result: &AnnotatedResult) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        write_rows(&self.path, &AnnotatedRow::COLUMNS, &result.rows)
    }

    fn read(&self) -> Result<Option<AnnotatedResult>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let rows = read_rows::<AnnotatedRow>(&self.path)?;
        Ok(Some(AnnotatedResult { rows }))
    }
}
