//! Builds a typed, row-ordered table from raw log lines.
//!
//! Lines that fail to parse are dropped. Fields that fail to coerce
//! (timestamp, status, size) become `None`; a build never fails.

use super::line::{parse_line, ParsedRecord};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// `10/Oct/2020:13:55:36 +0000`
pub const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// One parsed request, raw string fields plus coerced columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRow {
    pub ip: String,
    #[serde(with = "rfc3339")]
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub method: String,
    pub url: String,
    pub protocol: String,
    pub status: Option<i64>,
    pub size: Option<i64>,
    pub referer: String,
    pub user_agent: String,
}

impl LogRow {
    /// Column names in serialisation order.
    pub const COLUMNS: [&'static str; 9] = [
        "ip",
        "timestamp",
        "method",
        "url",
        "protocol",
        "status",
        "size",
        "referer",
        "user_agent",
    ];

    fn from_record(rec: &ParsedRecord<'_>) -> Self {
        Self {
            ip: rec.ip.to_string(),
            timestamp: DateTime::parse_from_str(rec.timestamp, TIMESTAMP_FORMAT).ok(),
            method: rec.method.to_string(),
            url: rec.url.to_string(),
            protocol: rec.protocol.to_string(),
            status: rec.status.parse().ok(),
            size: rec.size.parse().ok(),
            referer: rec.referer.to_string(),
            user_agent: rec.user_agent.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogTable {
    /// Rows in input file order
    pub rows: Vec<LogRow>,
    /// Input lines that did not match the grammar
    pub dropped_lines: usize,
}

impl LogTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogTableBuilder;

impl LogTableBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Parse every line, keeping matches in order.
    pub fn build<I, S>(&self, lines: I) -> LogTable
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = LogTable::default();
        for line in lines {
            match parse_line(line.as_ref()) {
                Some(rec) => table.rows.push(LogRow::from_record(&rec)),
                None => table.dropped_lines += 1,
            }
        }
        table
    }

    /// Build from an in-memory file body. `\n`, `\r\n` and bare `\r` all end a line.
    pub fn build_from_str(&self, text: &str) -> LogTable {
        self.build(universal_lines(text))
    }

    /// Build from a reader. Invalid UTF-8 is replaced rather than rejected.
    pub fn build_from_reader<R: Read>(&self, mut reader: R) -> std::io::Result<LogTable> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(self.build_from_str(&String::from_utf8_lossy(&buf)))
    }
}

/// Like [`str::lines`], but a lone `\r` is a terminator too.
fn universal_lines(text: &str) -> impl Iterator<Item = &str> + '_ {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest.find(|c: char| c == '\n' || c == '\r').unwrap_or(rest.len());
        let (line, tail) = rest.split_at(end);
        rest = match tail.strip_prefix("\r\n") {
            Some(after) => after,
            None if tail.is_empty() => tail,
            None => &tail[1..],
        };
        Some(line)
    })
}

/// Timestamps as `DateTime::to_rfc3339` renders them (`+00:00`, never `Z`), so every
/// artifact and the JSON API agree. Empty or absent means `None`.
pub mod rfc3339 {
    use chrono::{DateTime, FixedOffset};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Option<DateTime<FixedOffset>>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.serialize_some(&ts.to_rfc3339()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<FixedOffset>>, D::Error> {
        Option::<String>::deserialize(d)?
            .filter(|s| !s.is_empty())
            .map(|s| DateTime::parse_from_rfc3339(&s).map_err(D::Error::custom))
            .transpose()
    }
}
