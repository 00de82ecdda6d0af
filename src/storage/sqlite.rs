//! SQLite backend. The whole result set is replaced inside one transaction.

use super::{ResultsStore, StorageError};
use crate::model::AnomalyLabel;
use crate::scoring::{AnnotatedResult, AnnotatedRow};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

const WRITTEN_KEY: &str = "results_written_at";

pub struct SqliteResultsStore {
    conn: Mutex<Connection>,
}

struct StoredRow {
    ip: String,
    ts: Option<String>,
    method: String,
    url: String,
    protocol: String,
    status: Option<i64>,
    size: Option<i64>,
    referer: String,
    user_agent: String,
    anomaly: String,
}

impl StoredRow {
    fn into_row(self, idx: usize) -> Result<AnnotatedRow, StorageError> {
        let corrupt = |reason: String| StorageError::Corrupt { row: idx, reason };
        let timestamp = match self.ts {
            Some(ts) => Some(DateTime::parse_from_rfc3339(&ts).map_err(|e| corrupt(format!("timestamp: {e}")))?),
            None => None,
        };
        let anomaly = AnomalyLabel::parse(&self.anomaly)
            .ok_or_else(|| corrupt(format!("unknown label {:?}", self.anomaly)))?;
        Ok(AnnotatedRow {
            ip: self.ip,
            timestamp,
            method: self.method,
            url: self.url,
            protocol: self.protocol,
            status: self.status,
            size: self.size,
            referer: self.referer,
            user_agent: self.user_agent,
            anomaly,
        })
    }
}

impl SqliteResultsStore {
    /// Open or create DB at path.
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS results (
                row_idx INTEGER PRIMARY KEY,
                ip TEXT NOT NULL,
                ts TEXT,
                method TEXT NOT NULL,
                url TEXT NOT NULL,
                protocol TEXT NOT NULL,
                status INTEGER,
                size INTEGER,
                referer TEXT NOT NULL,
                user_agent TEXT NOT NULL,
                anomaly TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS meta (k TEXT PRIMARY KEY, v TEXT);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl ResultsStore for SqliteResultsStore {
    fn write(&self, result: &AnnotatedResult) -> Result<(), StorageError> {
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM results", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO results (row_idx, ip, ts, method, url, protocol, status, size, referer, user_agent, anomaly)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for (i, r) in result.rows.iter().enumerate() {
                stmt.execute(params![
                    i as i64,
                    r.ip,
                    r.timestamp.map(|t| t.to_rfc3339()),
                    r.method,
                    r.url,
                    r.protocol,
                    r.status,
                    r.size,
                    r.referer,
                    r.user_agent,
                    r.anomaly.as_str(),
                ])?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO meta (k, v) VALUES (?1, ?2)",
            params![WRITTEN_KEY, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn read(&self) -> Result<Option<AnnotatedResult>, StorageError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let written: Option<String> = conn
            .query_row("SELECT v FROM meta WHERE k = ?1", params![WRITTEN_KEY], |row| row.get(0))
            .optional()?;
        if written.is_none() {
            return Ok(None);
        }

        let mut stmt = conn.prepare(
            "SELECT ip, ts, method, url, protocol, status, size, referer, user_agent, anomaly
             FROM results ORDER BY row_idx",
        )?;
        let stored = stmt.query_map([], |row| {
            Ok(StoredRow {
                ip: row.get(0)?,
                ts: row.get(1)?,
                method: row.get(2)?,
                url: row.get(3)?,
                protocol: row.get(4)?,
                status: row.get(5)?,
                size: row.get(6)?,
                referer: row.get(7)?,
                user_agent: row.get(8)?,
                anomaly: row.get(9)?,
            })
        })?;

        let mut rows = Vec::new();
        for (i, r) in stored.enumerate() {
            rows.push(r?.into_row(i)?);
        }
        Ok(Some(AnnotatedResult { rows }))
    }
}
