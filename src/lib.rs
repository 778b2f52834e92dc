//! SysWatch - metrics persistence, rollup statistics and periodic collection
//!
//! This crate stores timestamped system-metrics samples in SQLite, computes
//! windowed aggregate statistics and threshold-based peak detection over
//! them, exports history to CSV/JSON, and drives a periodic collection loop
//! against a caller-supplied collector.
//!
//! Reading OS counters is deliberately out of scope: implement
//! [`MetricCollector`](collector::MetricCollector) with whatever native
//! bindings fit your platform and hand it to the loop.
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use syswatch::prelude::*;
//!
//! # async fn demo(collector: impl MetricCollector) -> syswatch::Result<()> {
//! let store = MetricStore::open("syswatch.db")?;
//!
//! // Periodic collection: 10 samples, one per minute.
//! let mut monitor = CollectionLoop::new(collector, store.clone());
//! monitor.run(Duration::from_secs(60), 10).await?;
//!
//! // Windowed statistics over the last 24 hours.
//! match store.get_statistics("web-01", 24)? {
//!     Some(report) => println!("{} samples, avg CPU {:.2}%", report.count, report.cpu.avg),
//!     None => println!("no data for this host/window"),
//! }
//!
//! // Retention: drop samples older than 30 days.
//! let pruned = store.cleanup_old(30)?;
//! println!("pruned {pruned} rows");
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Faults are absorbed at the smallest scope that can contain them: a
//! malformed CSV record is skipped, a failed loop iteration is logged and
//! retried on the next tick (by default), while a store that cannot be
//! opened at all fails [`MetricStore::open`](store::MetricStore::open).
//! "No data" is always an explicit empty result ([`None`], an empty vec),
//! never an error and never fabricated zeros.

pub mod collector;
pub mod error;
pub mod export;
pub mod monitor;
pub mod sample;
pub mod stats;
pub mod store;

pub use error::{Error, Result};

/// Re-export common types for convenience
pub mod prelude {
    pub use crate::collector::MetricCollector;
    pub use crate::error::{Error, Result};
    pub use crate::export::ExportPaths;
    pub use crate::monitor::{CollectionLoop, ErrorPolicy};
    pub use crate::sample::{DiskUsage, PartitionUsage, Sample};
    pub use crate::stats::{MetricSummary, PeakEvent, StatisticsReport};
    pub use crate::store::MetricStore;
}
