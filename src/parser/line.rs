//! Combined-log-format line parser.
//!
//! `<ip> - - [<timestamp>] "<METHOD> <url> <protocol>" <status> <size> "<referer>" "<user_agent>"`
//!
//! Matching is anchored at the start of the line only; trailing text is ignored.
//! A line that does not match yields `None` and is meant to be dropped silently.

use regex::Regex;
use std::sync::OnceLock;

static LINE_RE: OnceLock<Regex> = OnceLock::new();

fn line_regex() -> &'static Regex {
    LINE_RE.get_or_init(|| {
        Regex::new(
            r#"^(?P<ip>\d+\.\d+\.\d+\.\d+) - - \[(?P<timestamp>.*?)\] "(?P<method>[A-Z]+) (?P<url>.*?) (?P<protocol>HTTP/\d\.\d)" (?P<status>\d+) (?P<size>\d+) "(?P<referer>.*?)" "(?P<user_agent>.*?)""#,
        )
        .expect("access log regex")
    })
}

/// Raw field values of one matched line, borrowed from the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedRecord<'a> {
    pub ip: &'a str,
    pub timestamp: &'a str,
    pub method: &'a str,
    pub url: &'a str,
    pub protocol: &'a str,
    pub status: &'a str,
    pub size: &'a str,
    pub referer: &'a str,
    pub user_agent: &'a str,
}

/// Parse one line. Returns `None` when the line does not match the grammar.
pub fn parse_line(line: &str) -> Option<ParsedRecord<'_>> {
    let caps = line_regex().captures(line)?;
    let field = |name: &str| caps.name(name).map(|m| m.as_str());
    Some(ParsedRecord {
        ip: field("ip")?,
        timestamp: field("timestamp")?,
        method: field("method")?,
        url: field("url")?,
        protocol: field("protocol")?,
        status: field("status")?,
        size: field("size")?,
        referer: field("referer")?,
        user_agent: field("user_agent")?,
    })
}
