// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Query history from a BIND9 query log.
//!
//! Counts queries by type over the most recent lines of the log and reports
//! the timestamps of the oldest and newest line in that window. The query
//! type is the 9th space-separated field of a line, the timestamp the first
//! two:
//!
//! ```text
//! 19-Oct-2026 10:00:00.123 client 10.0.0.1#5353 (host1.example.com): query: host1.example.com IN A +E(0)K
//! ```

use serde::Serialize;
use std::collections::VecDeque;
use std::path::Path;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

const QUERY_TYPE_FIELD: usize = 8;

/// Errors summarizing a query log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryLogError {
    #[error("Failed to read query log {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Query log {source_name} has no query entries")]
    Empty { source_name: String },
}

/// Query counts over a log window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuerySummary {
    pub a: u64,
    pub aaaa: u64,
    pub cname: u64,
    pub ns: u64,
    pub other: u64,
    /// Lines too short to carry a query type, or not UTF-8
    pub skipped: u64,
    pub first_seen: Option<String>,
    pub last_seen: Option<String>,
}

impl QuerySummary {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.a + self.aaaa + self.cname + self.ns + self.other
    }

    fn count(&mut self, line: &str) {
        let fields: Vec<&str> = line.split(' ').collect();
        let Some(query_type) = fields.get(QUERY_TYPE_FIELD) else {
            self.skipped += 1;
            return;
        };
        match *query_type {
            "A" => self.a += 1,
            "AAAA" => self.aaaa += 1,
            "CNAME" => self.cname += 1,
            "NS" => self.ns += 1,
            _ => self.other += 1,
        }

        let timestamp = format!("{} {}", fields[0], fields[1]);
        if self.first_seen.is_none() {
            self.first_seen = Some(timestamp.clone());
        }
        self.last_seen = Some(timestamp);
    }
}

/// Summarize the last `window` lines.
///
/// # Errors
///
/// Returns [`QueryLogError::Empty`] if the window holds no query entries.
pub fn summarize<S: AsRef<str>>(lines: &[S], window: usize) -> Result<QuerySummary, QueryLogError> {
    let start = lines.len().saturating_sub(window);
    let mut summary = QuerySummary::default();
    for line in &lines[start..] {
        let line = line.as_ref().trim_end();
        if !line.is_empty() {
            summary.count(line);
        }
    }

    if summary.total() == 0 {
        return Err(QueryLogError::Empty {
            source_name: "input".to_string(),
        });
    }
    Ok(summary)
}

/// Summarize the last `window` lines of the log file at `path`.
///
/// Only `window` lines are held in memory at a time. A line that is not
/// valid UTF-8 is counted as skipped.
///
/// # Errors
///
/// Returns [`QueryLogError::Read`] if the file cannot be read and
/// [`QueryLogError::Empty`] if it holds no query entries.
pub async fn summarize_file(path: &Path, window: usize) -> Result<QuerySummary, QueryLogError> {
    let read_error = |e: std::io::Error| QueryLogError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    let file = tokio::fs::File::open(path).await.map_err(read_error)?;
    let mut reader = BufReader::new(file);
    // None marks a line that is not UTF-8
    let mut tail: VecDeque<Option<String>> = VecDeque::with_capacity(window.min(4096));
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await.map_err(read_error)? == 0 {
            break;
        }
        if window == 0 {
            continue;
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(text) => Some(text.to_string()),
            Err(e) => {
                debug!(
                    path = %path.display(),
                    line = %String::from_utf8_lossy(&buf).trim_end(),
                    error = %e,
                    "Skipping query log line that is not UTF-8"
                );
                None
            }
        };
        if tail.len() == window {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    debug!(path = %path.display(), lines = tail.len(), "Read query log tail");

    let undecodable = tail.iter().filter(|line| line.is_none()).count();
    let lines: Vec<String> = tail.into_iter().flatten().collect();
    summarize(&lines, window)
        .map(|mut summary| {
            summary.skipped += u64::try_from(undecodable).unwrap_or(u64::MAX);
            summary
        })
        .map_err(|e| {
            warn!(path = %path.display(), error = %e, "Query log summary unavailable");
            match e {
                QueryLogError::Empty { .. } => QueryLogError::Empty {
                    source_name: path.display().to_string(),
                },
                other => other,
            }
        })
}

#[cfg(test)]
#[path = "query_history_tests.rs"]
mod query_history_tests;
