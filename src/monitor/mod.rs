//! Periodic collection loop.
//!
//! [`CollectionLoop`] drives a [`MetricCollector`] into a [`MetricStore`]:
//! collect, save, sleep, repeat. One logical worker per loop; the collect
//! call, the storage write and the inter-iteration sleep are strictly
//! sequential, so a single loop never races itself on the store. Several
//! loops may share one store file, the per-operation connections keep
//! their writes independent.
//!
//! Cancellation is cooperative, through a `tokio::sync::watch` channel
//! checked at iteration boundaries. A signal arriving mid-iteration takes
//! effect after the in-flight save completes; no partial sample is ever
//! persisted.
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use tokio::sync::watch;
//! use syswatch::monitor::CollectionLoop;
//! use syswatch::store::MetricStore;
//! # use syswatch::collector::MetricCollector;
//! # async fn demo(collector: impl MetricCollector) -> syswatch::Result<()> {
//! let store = MetricStore::open("syswatch.db")?;
//! let (stop_tx, stop_rx) = watch::channel(false);
//!
//! let mut monitor = CollectionLoop::new(collector, store).with_shutdown(stop_rx);
//! let iterations = monitor.run(Duration::from_secs(60), 0).await?;
//! # let _ = (stop_tx, iterations);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::collector::MetricCollector;
use crate::error::Result;
use crate::export;
use crate::store::MetricStore;

/// What to do when one iteration's collect or save fails.
///
/// The default is [`Continue`](ErrorPolicy::Continue): a transient
/// collector or storage fault is logged and the next tick retries, so a
/// long-running monitor survives hiccups. [`Abort`](ErrorPolicy::Abort)
/// surfaces the first fault to the caller instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    #[default]
    Continue,
    Abort,
}

/// Drives periodic sampling into a store.
pub struct CollectionLoop<C> {
    collector: C,
    store: MetricStore,
    policy: ErrorPolicy,
    history_path: Option<PathBuf>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<C: MetricCollector> CollectionLoop<C> {
    /// Create a loop with the default log-and-continue failure policy and
    /// no cancellation channel.
    pub fn new(collector: C, store: MetricStore) -> Self {
        Self { collector, store, policy: ErrorPolicy::default(), history_path: None, shutdown: None }
    }

    /// Set the per-iteration failure policy.
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Also append each sample to a CSV history file.
    pub fn with_history(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = Some(path.into());
        self
    }

    /// Attach a cancellation channel. Sending `true` stops the loop at the
    /// next iteration boundary.
    pub fn with_shutdown(mut self, rx: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(rx);
        self
    }

    /// Run the loop: collect, save, sleep `interval`, repeat.
    ///
    /// With `max_iterations > 0` the loop performs exactly that many
    /// iterations and returns after the final save, with no trailing
    /// sleep. `max_iterations == 0` runs until cancelled.
    ///
    /// Returns the number of iterations performed. Under
    /// [`ErrorPolicy::Abort`] the first collect or save fault is returned
    /// instead; under [`ErrorPolicy::Continue`] faults are logged and the
    /// failed tick still counts.
    pub async fn run(&mut self, interval: Duration, max_iterations: u64) -> Result<u64> {
        let mut iterations = 0u64;

        loop {
            if self.stop_requested() {
                info!(iterations, "collection loop cancelled");
                break;
            }

            if let Err(e) = self.tick().await {
                match self.policy {
                    ErrorPolicy::Continue => warn!(error = %e, "iteration failed, continuing"),
                    ErrorPolicy::Abort => return Err(e),
                }
            }
            iterations += 1;

            if max_iterations > 0 && iterations >= max_iterations {
                info!(iterations, "collection loop finished");
                break;
            }

            if self.pause(interval).await {
                info!(iterations, "collection loop cancelled");
                break;
            }
        }

        Ok(iterations)
    }

    /// One iteration: collect a sample, persist it, append history.
    async fn tick(&self) -> Result<()> {
        let sample = self.collector.collect().await?;
        info!(%sample, "collected");
        self.store.save(&sample)?;

        if let Some(path) = &self.history_path {
            export::append_history_csv(&sample, path)?;
        }
        Ok(())
    }

    fn stop_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Sleep between iterations; returns `true` when cancelled instead.
    async fn pause(&mut self, interval: Duration) -> bool {
        let Some(rx) = self.shutdown.as_mut() else {
            tokio::time::sleep(interval).await;
            return false;
        };

        tokio::select! {
            _ = wait_for_stop(rx) => true,
            _ = tokio::time::sleep(interval) => false,
        }
    }
}

/// Resolves once the channel observes a stop signal. A dropped sender can
/// no longer cancel, so the future pends and the sleep wins the race.
async fn wait_for_stop(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
