//! CSV history and JSON export.
//!
//! Two outputs, both consumed by external tooling rather than by this
//! crate: a CSV history file that accumulates one flattened row per sample
//! (the format [`stats`](crate::stats) reads back), and an on-demand JSON
//! dump of a host's most recent stored rows.
//!
//! Destinations are passed in explicitly, either per call or bundled in
//! [`ExportPaths`]; nothing here reads a process-wide constant.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::sample::Sample;
use crate::store::{format_ts, MetricStore};

/// Column order of the history CSV.
const HISTORY_HEADER: [&str; 7] = [
    "timestamp",
    "hostname",
    "cpu_percent",
    "mem_total_gb",
    "mem_dispo_gb",
    "mem_percent",
    "disk_root_percent",
];

/// Where periodic and on-demand exports land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    /// CSV file the collection loop appends to.
    pub history_path: PathBuf,
    /// Destination for on-demand JSON dumps.
    pub export_path: PathBuf,
}

impl Default for ExportPaths {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from("syswatch_history.csv"),
            export_path: PathBuf::from("syswatch_last.json"),
        }
    }
}

impl ExportPaths {
    /// Append one sample to the configured history file.
    pub fn append_history(&self, sample: &Sample) -> Result<()> {
        append_history_csv(sample, &self.history_path)
    }

    /// Dump the newest `limit` rows for `hostname` to the configured JSON
    /// path; returns how many rows were written.
    pub fn export_latest(
        &self,
        store: &MetricStore,
        hostname: &str,
        limit: usize,
    ) -> Result<usize> {
        export_latest_json(store, hostname, limit, &self.export_path)
    }
}

/// Append one flattened row to a history CSV, writing the header first
/// when the file is new or empty.
///
/// Memory columns are converted to GiB; `disk_root_percent` is the `/`
/// mount's usage and left blank when that mount was not statted.
pub fn append_history_csv(sample: &Sample, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let write_header = std::fs::metadata(path).map_or(true, |meta| meta.len() == 0);

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::Writer::from_writer(file);

    if write_header {
        writer.write_record(HISTORY_HEADER)?;
    }
    writer.write_record(&[
        format_ts(&sample.timestamp),
        sample.hostname.clone(),
        sample.cpu_percent.to_string(),
        format_gib(sample.memory_total),
        format_gib(sample.memory_available),
        sample.memory_percent.to_string(),
        sample.root_disk_percent().map(|p| p.to_string()).unwrap_or_default(),
    ])?;
    writer.flush()?;
    Ok(())
}

/// Write the newest `limit` rows for `hostname` as a pretty-printed JSON
/// array; returns how many rows were written.
///
/// A host with no rows produces an empty array, not an error.
pub fn export_latest_json(
    store: &MetricStore,
    hostname: &str,
    limit: usize,
    path: impl AsRef<Path>,
) -> Result<usize> {
    let rows = store.get_latest(hostname, limit)?;

    let file = std::fs::File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, &rows)?;

    debug!(rows = rows.len(), path = %path.as_ref().display(), "exported JSON");
    Ok(rows.len())
}

fn format_gib(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / (1024u64.pow(3)) as f64)
}

#[cfg(test)]
mod tests;
