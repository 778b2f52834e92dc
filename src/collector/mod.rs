//! Collector boundary.
//!
//! Reading OS counters is outside this crate; callers supply a
//! [`MetricCollector`] implementation (psutil-style native bindings, an
//! agent RPC, a replayed trace). The contract is small on purpose: one
//! call, one [`Sample`], or a collector-specific error.
//!
//! Implementations that walk mounted partitions should omit mounts they
//! cannot stat rather than failing the whole snapshot; an absent mount in
//! [`DiskUsage`](crate::sample::DiskUsage) means "not statted".

use async_trait::async_trait;

use crate::error::Result;
use crate::sample::Sample;

/// Source of metrics samples.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricCollector: Send + Sync {
    /// Take one measurement snapshot.
    ///
    /// Expected to be bounded-time; the collection loop imposes no timeout
    /// of its own, so a hung collector blocks its loop.
    async fn collect(&self) -> Result<Sample>;
}
