//! Concurrent download engine.
//!
//! Split into focused submodules:
//! - [`context`] - Per-run counters, admission gate, and shared handles
//! - [`target`] - URL and output path resolution, including id corrections
//! - `fetch` - Single-item fetch, classification, and completion recording
//! - `progress` - Background progress reporter
//!
//! A run spawns one task per item into a [`tokio::task::JoinSet`]. A
//! semaphore permit is acquired before each spawn and released when the
//! task ends, so at most `download.concurrency` fetches are ever in flight.
//! The run returns only after every task has been joined and the reporter
//! has stopped.

pub mod context;
mod fetch;
mod progress;
pub mod target;


use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::completion_store::CompletionStores;
use crate::config::Config;
use crate::error::Result;
use crate::types::{DownloadOutcome, Event, RunReport, WorkItem};

pub use context::EngineCounters;
pub use target::{DownloadTarget, corrected_id};

use context::RunContext;
use progress::{ProgressReporterParams, spawn_progress_reporter};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Bulk image downloader
///
/// Cheap to clone; clones share the HTTP connection pool and event channel.
/// Every call to [`Downloader::run`] gets its own counters and admission
/// gate, so runs never observe each other's state.
#[derive(Clone)]
pub struct Downloader {
    config: Arc<Config>,
    stores: Arc<CompletionStores>,
    http_client: reqwest::Client,
    event_tx: broadcast::Sender<Event>,
}

impl Downloader {
    /// Create a downloader
    ///
    /// # Errors
    /// Returns error if the config is invalid or the HTTP client cannot be created
    pub fn new(config: Config, stores: Arc<CompletionStores>) -> Result<Self> {
        config.validate()?;

        let concurrency = config.download.concurrency;
        let http_client = reqwest::Client::builder()
            .timeout(config.download.request_timeout)
            .connect_timeout(config.download.connect_timeout)
            .pool_max_idle_per_host(concurrency)
            .user_agent(config.download.user_agent.as_str())
            .build()?;

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config: Arc::new(config),
            stores,
            http_client,
            event_tx,
        })
    }

    /// Subscribe to progress and per-item events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Completion trackers this downloader records into
    pub fn stores(&self) -> &Arc<CompletionStores> {
        &self.stores
    }

    /// Download every item and return the number of HTTP status failures
    pub async fn run(&self, items: Vec<WorkItem>) -> u64 {
        self.run_with_report(items).await.http_failures
    }

    /// Download every item and return the full tally
    ///
    /// An empty list returns immediately without touching the network.
    pub async fn run_with_report(&self, items: Vec<WorkItem>) -> RunReport {
        let total = items.len() as u64;
        if items.is_empty() {
            tracing::info!("No new images require downloading");
            return RunReport::default();
        }

        let concurrency = self.config.download.concurrency;
        let ctx = Arc::new(RunContext::new(
            self.http_client.clone(),
            self.config.images.clone(),
            Arc::clone(&self.stores),
            concurrency,
            self.event_tx.clone(),
        ));

        tracing::info!(total, concurrency, "Starting download");
        let started = Instant::now();
        let cancel_token = CancellationToken::new();
        let reporter = spawn_progress_reporter(ProgressReporterParams {
            total,
            started,
            interval: self.config.download.progress_interval,
            counters: Arc::clone(&ctx.counters),
            event_tx: self.event_tx.clone(),
            cancel_token: cancel_token.clone(),
        });

        let mut tasks = JoinSet::new();
        for item in items {
            let permit = match Arc::clone(&ctx.admission).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    // the gate is never closed while a run owns it
                    tracing::error!(item_id = %item.id, error = %e, "Admission gate closed");
                    ctx.counters
                        .record(&DownloadOutcome::Transport(e.to_string()));
                    continue;
                }
            };

            let task_ctx = Arc::clone(&ctx);
            tasks.spawn(async move {
                let _permit = permit;
                fetch::process_item(&task_ctx, item).await
            });

            while let Some(joined) = tasks.try_join_next() {
                handle_joined(&ctx, joined);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            handle_joined(&ctx, joined);
        }

        cancel_token.cancel();
        if let Err(e) = reporter.await {
            tracing::error!(error = %e, "Progress reporter panicked");
        }

        let counters = &ctx.counters;
        let report = RunReport {
            total,
            processed: counters.processed(),
            succeeded: counters.succeeded(),
            http_failures: counters.http_failures(),
            other_failures: counters.other_failures(),
            peak_in_flight: counters.peak_in_flight(),
            elapsed: started.elapsed(),
        };
        tracing::info!(
            processed = report.processed,
            succeeded = report.succeeded,
            http_failures = report.http_failures,
            other_failures = report.other_failures,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Download run finished"
        );
        report
    }
}

/// Account for a worker that died before recording its own outcome.
fn handle_joined(ctx: &RunContext, joined: std::result::Result<DownloadOutcome, JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "Download task panicked");
        ctx.counters
            .record(&DownloadOutcome::Transport(format!("download task failed: {e}")));
    }
}
