//! Aggregate statistics and peak detection over sample sequences.
//!
//! Everything here is a pure function: the same input always yields the
//! same report, and nothing is persisted. Samples can come from a
//! [`MetricStore`](crate::store::MetricStore) query, an in-memory slice or
//! a CSV history file written by [`export`](crate::export).
//!
//! The CSV-sourced variants are deliberately forgiving: a row whose numeric
//! fields are blank or unparseable is skipped, and a missing file counts as
//! "no data". One bad record must not invalidate the rest of a report.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::sample::Sample;
use crate::store::format_ts;

/// Arithmetic mean plus extremes of one metric over a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// Aggregate over a set of samples. Never persisted; recomputed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    /// Number of samples that contributed.
    pub count: u64,
    /// CPU percentage summary.
    pub cpu: MetricSummary,
    /// Memory percentage summary.
    pub memory: MetricSummary,
    /// Start of the window the report covers, when known. Store-backed
    /// reports carry the query cutoff; slice- and CSV-backed reports carry
    /// the earliest contributing timestamp, or `None` when no row had a
    /// parseable one.
    pub window_start: Option<DateTime<Utc>>,
}

/// A sample surfaced because it exceeded a threshold on CPU or memory.
///
/// The timestamp is kept in its textual form so that CSV-sourced events
/// reproduce the file verbatim; sample-sourced events use ISO-8601 second
/// precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakEvent {
    pub timestamp: String,
    pub hostname: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// Average/min/max of CPU and memory percentages across `samples`.
///
/// Returns `None` for an empty slice: there is no meaningful average of
/// nothing, and fabricating zeros would be indistinguishable from real
/// idle readings.
pub fn aggregate(samples: &[Sample]) -> Option<StatisticsReport> {
    if samples.is_empty() {
        return None;
    }

    let cpu = summarize(samples.iter().map(|s| s.cpu_percent));
    let memory = summarize(samples.iter().map(|s| s.memory_percent));
    let window_start = samples.iter().map(|s| s.timestamp).min();

    Some(StatisticsReport { count: samples.len() as u64, cpu, memory, window_start })
}

/// Every sample whose CPU or memory percentage strictly exceeds its
/// threshold, in input order. Boundary-equal values are not peaks.
pub fn detect_peaks(samples: &[Sample], cpu_threshold: f64, mem_threshold: f64) -> Vec<PeakEvent> {
    samples
        .iter()
        .filter(|s| s.cpu_percent > cpu_threshold || s.memory_percent > mem_threshold)
        .map(|s| PeakEvent {
            timestamp: format_ts(&s.timestamp),
            hostname: s.hostname.clone(),
            cpu_percent: s.cpu_percent,
            memory_percent: s.memory_percent,
        })
        .collect()
}

/// Aggregate CPU and memory statistics from a CSV history file.
///
/// Rows with blank or non-numeric percentage fields are skipped. A file
/// that does not exist yields `Ok(None)`, same as an empty one; other I/O
/// faults propagate.
pub fn aggregate_csv(path: impl AsRef<Path>) -> Result<Option<StatisticsReport>> {
    let rows = match read_history_rows(path.as_ref())? {
        Some(rows) => rows,
        None => return Ok(None),
    };
    if rows.is_empty() {
        return Ok(None);
    }

    let cpu = summarize(rows.iter().map(|r| r.cpu_percent));
    let memory = summarize(rows.iter().map(|r| r.memory_percent));
    let window_start = rows.iter().filter_map(|r| parse_history_ts(&r.timestamp)).min();

    Ok(Some(StatisticsReport { count: rows.len() as u64, cpu, memory, window_start }))
}

/// Detect threshold-exceeding rows in a CSV history file.
///
/// Same tolerance rules as [`aggregate_csv`]: unparseable rows are skipped
/// and a missing file yields no peaks.
pub fn detect_peaks_csv(
    path: impl AsRef<Path>,
    cpu_threshold: f64,
    mem_threshold: f64,
) -> Result<Vec<PeakEvent>> {
    let rows = match read_history_rows(path.as_ref())? {
        Some(rows) => rows,
        None => return Ok(Vec::new()),
    };

    Ok(rows
        .into_iter()
        .filter(|r| r.cpu_percent > cpu_threshold || r.memory_percent > mem_threshold)
        .map(|r| PeakEvent {
            timestamp: r.timestamp,
            hostname: r.hostname,
            cpu_percent: r.cpu_percent,
            memory_percent: r.memory_percent,
        })
        .collect())
}

fn summarize(values: impl Iterator<Item = f64>) -> MetricSummary {
    let mut count = 0u64;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for v in values {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }

    // Callers only summarize non-empty sequences.
    MetricSummary { avg: sum / count as f64, min, max }
}

/// One successfully parsed history row.
struct HistoryRow {
    timestamp: String,
    hostname: String,
    cpu_percent: f64,
    memory_percent: f64,
}

/// Read the valid rows of a history CSV. `Ok(None)` means the file does
/// not exist.
fn read_history_rows(path: &Path) -> Result<Option<Vec<HistoryRow>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    // Flexible: ragged rows are short records to skip, not hard errors.
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let (ts_col, host_col, cpu_col, mem_col) = match (
        column("timestamp"),
        column("hostname"),
        column("cpu_percent"),
        column("mem_percent"),
    ) {
        (Some(ts), Some(host), Some(cpu), Some(mem)) => (ts, host, cpu, mem),
        // A file without the expected columns has no usable rows.
        _ => return Ok(Some(Vec::new())),
    };

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            // One unreadable record must not invalidate the rest.
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        let numeric = |col: usize| {
            record
                .get(col)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .and_then(|v| v.parse::<f64>().ok())
        };

        match (numeric(cpu_col), numeric(mem_col)) {
            (Some(cpu_percent), Some(memory_percent)) => rows.push(HistoryRow {
                timestamp: record.get(ts_col).unwrap_or_default().to_string(),
                hostname: record.get(host_col).unwrap_or_default().to_string(),
                cpu_percent,
                memory_percent,
            }),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, path = %path.display(), "skipped malformed history rows");
    }
    Ok(Some(rows))
}

/// History files may carry fractional seconds; accept both.
fn parse_history_ts(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
