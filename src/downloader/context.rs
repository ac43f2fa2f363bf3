//! Per-run shared state: counters, admission gate, and collaborator handles.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Semaphore, broadcast};

use crate::completion_store::CompletionStores;
use crate::config::ImageConfig;
use crate::types::{DownloadOutcome, Event};

/// Monotonic counters updated by every worker and sampled by the reporter.
///
/// Every finished item bumps `processed` once and exactly one outcome bucket.
#[derive(Debug, Default)]
pub struct EngineCounters {
    processed: AtomicU64,
    succeeded: AtomicU64,
    http_failures: AtomicU64,
    other_failures: AtomicU64,
    in_flight: AtomicU64,
    peak_in_flight: AtomicU64,
}

impl EngineCounters {
    /// Items finished so far
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Items written successfully
    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    /// Items rejected with a non-2xx status
    pub fn http_failures(&self) -> u64 {
        self.http_failures.load(Ordering::Relaxed)
    }

    /// Items lost to transport or filesystem errors
    pub fn other_failures(&self) -> u64 {
        self.other_failures.load(Ordering::Relaxed)
    }

    /// Highest number of simultaneously running fetches
    pub fn peak_in_flight(&self) -> u64 {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    /// Count one finished item
    pub(crate) fn record(&self, outcome: &DownloadOutcome) {
        let bucket = match outcome {
            DownloadOutcome::Success => &self.succeeded,
            DownloadOutcome::HttpStatus(_) => &self.http_failures,
            DownloadOutcome::Transport(_) => &self.other_failures,
        };
        bucket.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Mark a fetch as running until the returned guard drops
    pub(crate) fn enter(&self) -> InFlightGuard<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard { counters: self }
    }
}

/// Decrements the in-flight gauge on drop, including on panic.
pub(crate) struct InFlightGuard<'a> {
    counters: &'a EngineCounters,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Everything a worker needs, created fresh for each run.
pub(crate) struct RunContext {
    pub(crate) http_client: reqwest::Client,
    pub(crate) images: ImageConfig,
    pub(crate) stores: Arc<CompletionStores>,
    pub(crate) counters: Arc<EngineCounters>,
    pub(crate) admission: Arc<Semaphore>,
    pub(crate) event_tx: broadcast::Sender<Event>,
}

impl RunContext {
    pub(crate) fn new(
        http_client: reqwest::Client,
        images: ImageConfig,
        stores: Arc<CompletionStores>,
        concurrency: usize,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            http_client,
            images,
            stores,
            counters: Arc::new(EngineCounters::default()),
            admission: Arc::new(Semaphore::new(concurrency)),
            event_tx,
        }
    }
}
