//! Sample types for system-metrics snapshots.
//!
//! A [`Sample`] is one immutable, timestamped measurement of a host's CPU,
//! memory and disk state. Samples are produced by a
//! [`MetricCollector`](crate::collector::MetricCollector) implementation and
//! handed to the [`MetricStore`](crate::store::MetricStore); they are never
//! mutated after construction.
//!
//! # Examples
//!
//! ```
//! use syswatch::sample::{PartitionUsage, Sample};
//!
//! let mut sample = Sample::new("web-01", 42.5, 17_179_869_184, 8_589_934_592, 50.0);
//! sample.disk_usage.insert(
//!     "/".to_string(),
//!     PartitionUsage { total: 500_000_000_000, used: 250_000_000_000, percent: 50.0 },
//! );
//!
//! println!("{sample}");
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Space accounting for one mounted partition.
///
/// Mount points the collector could not stat (permissions, stale mounts)
/// are simply absent from the snapshot; their absence is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PartitionUsage {
    /// Total capacity in bytes.
    pub total: u64,
    /// Used space in bytes.
    pub used: u64,
    /// Used percentage (0-100).
    pub percent: f64,
}

/// Disk usage keyed by mount point. May be empty.
pub type DiskUsage = BTreeMap<String, PartitionUsage>;

/// One timestamped system-metrics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Measurement instant, second resolution.
    pub timestamp: DateTime<Utc>,
    /// Identifying host name, non-empty.
    pub hostname: String,
    /// CPU utilization percentage (0-100).
    pub cpu_percent: f64,
    /// Total physical memory in bytes.
    pub memory_total: u64,
    /// Available memory in bytes.
    pub memory_available: u64,
    /// Memory utilization percentage (0-100).
    pub memory_percent: f64,
    /// Per-mount disk usage.
    pub disk_usage: DiskUsage,
}

impl Sample {
    /// Create a sample timestamped now, with an empty disk snapshot.
    pub fn new(
        hostname: impl Into<String>,
        cpu_percent: f64,
        memory_total: u64,
        memory_available: u64,
        memory_percent: f64,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            hostname: hostname.into(),
            cpu_percent,
            memory_total,
            memory_available,
            memory_percent,
            disk_usage: DiskUsage::new(),
        }
    }

    /// Replace the timestamp, keeping everything else.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Usage percentage of the root (`/`) mount, if it was statted.
    pub fn root_disk_percent(&self) -> Option<f64> {
        self.disk_usage.get("/").map(|p| p.percent)
    }
}

impl std::fmt::Display for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} | CPU: {:.1}% | RAM: {:.1}%",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.hostname,
            self.cpu_percent,
            self.memory_percent,
        )
    }
}
