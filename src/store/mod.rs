//! Durable SQLite storage for metrics samples.
//!
//! [`MetricStore`] is an append-only, host-keyed store of [`Sample`]s with
//! time-range statistics and retention pruning. Every operation opens its
//! own connection and releases it before returning, so no lock outlives a
//! single call and concurrent loops sharing one store file interleave
//! safely (SQLite serializes the writers).
//!
//! Timestamps are persisted as ISO-8601 text at second precision, which
//! keeps range predicates simple: lexicographic order on the column equals
//! chronological order.
//!
//! # Examples
//!
//! ```no_run
//! use syswatch::sample::Sample;
//! use syswatch::store::MetricStore;
//!
//! fn main() -> syswatch::Result<()> {
//!     let store = MetricStore::open("syswatch.db")?;
//!     store.save(&Sample::new("web-01", 12.5, 16_000, 8_000, 50.0))?;
//!
//!     for sample in store.get_latest("web-01", 10)? {
//!         println!("{sample}");
//!     }
//!
//!     if let Some(report) = store.get_statistics("web-01", 24)? {
//!         println!("avg CPU over 24h: {:.2}%", report.cpu.avg);
//!     }
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::sample::Sample;
use crate::stats::{MetricSummary, StatisticsReport};

/// Timestamp column format, second precision.
const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    hostname TEXT NOT NULL,
    cpu_percent REAL NOT NULL,
    memory_percent REAL NOT NULL,
    memory_total INTEGER NOT NULL,
    memory_available INTEGER NOT NULL,
    disk_usage TEXT
);
CREATE INDEX IF NOT EXISTS idx_metrics_ts_host
    ON metrics(timestamp, hostname);
";

pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub(crate) fn parse_ts(text: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, TS_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::invalid_data(format!("bad timestamp {text:?}: {e}")))
}

/// Append-only store of [`Sample`]s backed by a SQLite file.
///
/// Cloning is cheap; clones share the same database file but no connection
/// state, so they can be handed to independent collection loops.
#[derive(Debug, Clone)]
pub struct MetricStore {
    path: PathBuf,
}

impl MetricStore {
    /// Open the store, creating the database file and schema if absent.
    ///
    /// Schema creation is idempotent; reopening an existing store is a
    /// cheap no-op beyond the schema check. A store that cannot be opened
    /// (unwritable directory, corrupt file) is fatal at this point.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self { path: path.as_ref().to_path_buf() };
        let conn = store.connection()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(store)
    }

    /// Path of the underlying database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connection(&self) -> Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    /// Append one sample.
    ///
    /// The row id is store-generated; there is no uniqueness constraint
    /// beyond it, so saving the same measurement twice stores two rows.
    /// Storage faults propagate to the caller untouched; the store never
    /// retries.
    pub fn save(&self, sample: &Sample) -> Result<()> {
        let disk_usage = serde_json::to_string(&sample.disk_usage)?;

        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO metrics (
                timestamp, hostname,
                cpu_percent, memory_percent,
                memory_total, memory_available,
                disk_usage
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                format_ts(&sample.timestamp),
                sample.hostname,
                sample.cpu_percent,
                sample.memory_percent,
                sample.memory_total as i64,
                sample.memory_available as i64,
                disk_usage,
            ],
        )?;
        debug!(host = %sample.hostname, ts = %format_ts(&sample.timestamp), "saved sample");
        Ok(())
    }

    /// Return up to `limit` samples for `hostname`, newest first.
    ///
    /// A host with no rows yields an empty vector, not an error.
    pub fn get_latest(&self, hostname: &str, limit: usize) -> Result<Vec<Sample>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT
                timestamp, hostname,
                cpu_percent, memory_percent,
                memory_total, memory_available,
                disk_usage
            FROM metrics
            WHERE hostname = ?1
            ORDER BY timestamp DESC
            LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![hostname, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;

        let mut samples = Vec::new();
        for row in rows {
            let (ts, host, cpu, mem_pct, mem_total, mem_avail, disks) = row?;
            samples.push(Sample {
                timestamp: parse_ts(&ts)?,
                hostname: host,
                cpu_percent: cpu,
                memory_percent: mem_pct,
                memory_total: mem_total as u64,
                memory_available: mem_avail as u64,
                disk_usage: match disks {
                    Some(text) => serde_json::from_str(&text)?,
                    None => Default::default(),
                },
            });
        }
        Ok(samples)
    }

    /// Aggregate CPU and memory percentages over the last `hours` hours.
    ///
    /// Returns `None` when no rows match, so callers can tell an empty
    /// window apart from a window of zero readings.
    #[instrument(skip(self))]
    pub fn get_statistics(
        &self,
        hostname: &str,
        hours: i64,
    ) -> Result<Option<StatisticsReport>> {
        let since = Utc::now() - Duration::hours(hours);
        let since_str = format_ts(&since);

        let conn = self.connection()?;
        let (count, cpu, memory) = conn.query_row(
            "SELECT
                COUNT(*),
                AVG(cpu_percent), MIN(cpu_percent), MAX(cpu_percent),
                AVG(memory_percent), MIN(memory_percent), MAX(memory_percent)
            FROM metrics
            WHERE hostname = ?1
              AND timestamp >= ?2",
            params![hostname, since_str],
            |row| {
                let count: i64 = row.get(0)?;
                let cpu = (
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                );
                let memory = (
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, Option<f64>>(5)?,
                    row.get::<_, Option<f64>>(6)?,
                );
                Ok((count, cpu, memory))
            },
        )?;

        if count == 0 {
            return Ok(None);
        }

        // COUNT(*) > 0 guarantees the aggregates are non-NULL.
        let summary = |(avg, min, max): (Option<f64>, Option<f64>, Option<f64>)| {
            match (avg, min, max) {
                (Some(avg), Some(min), Some(max)) => Ok(MetricSummary { avg, min, max }),
                _ => Err(Error::invalid_data("aggregate columns NULL with non-zero count")),
            }
        };

        Ok(Some(StatisticsReport {
            count: count as u64,
            cpu: summary(cpu)?,
            memory: summary(memory)?,
            window_start: Some(since),
        }))
    }

    /// Permanently delete rows older than `days` days; returns how many
    /// were removed.
    ///
    /// This is the only deletion path. No archival copy is made here; a
    /// caller wanting one must export before pruning.
    #[instrument(skip(self))]
    pub fn cleanup_old(&self, days: i64) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(days);
        let cutoff_str = format_ts(&cutoff);

        let conn = self.connection()?;
        let deleted =
            conn.execute("DELETE FROM metrics WHERE timestamp < ?1", params![cutoff_str])?;
        if deleted > 0 {
            debug!(deleted, "pruned old samples");
        }
        Ok(deleted)
    }

    /// Release held resources.
    ///
    /// Each operation opens and closes its own connection, so there is
    /// nothing to release; the method exists for contract symmetry. After
    /// calling it, further operations are not guaranteed to succeed.
    pub fn close(self) {}
}

#[cfg(test)]
mod tests;
