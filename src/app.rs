//! Process orchestration: environment setup, catalog resolution, filtering,
//! the download run itself, and tracker cleanup.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::catalog::CatalogClient;
use crate::completion_store::{CompletionStore, CompletionStores};
use crate::config::{Config, TrackerConfig};
use crate::downloader::Downloader;
use crate::error::Result;
use crate::types::{Event, RunReport};

/// What a run is about to do, known once the catalog has been filtered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunPlan {
    /// Candidate card ids returned by the catalog
    pub card_candidates: usize,
    /// Candidate field ids returned by the catalog
    pub field_candidates: usize,
    /// Items that still need downloading
    pub pending: usize,
}

/// Outcome of a full process run
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    /// Candidate card ids returned by the catalog
    pub card_candidates: usize,
    /// Candidate field ids returned by the catalog
    pub field_candidates: usize,
    /// Items that still needed downloading
    pub attempted: usize,
    /// Engine tally (default when nothing was attempted)
    pub report: RunReport,
    /// Both tracker files are gone after the run
    pub trackers_cleared: bool,
}

/// Create output directories and empty tracker files
///
/// Failures are logged; a missing directory is created again per item, and a
/// missing tracker only costs redundant downloads on the next run.
pub async fn prepare_environment(config: &Config) {
    for dir in config.required_dirs() {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!(path = %dir.display(), error = %e, "Could not create directory");
        }
    }
    for path in config.tracker.paths() {
        if let Err(e) = CompletionStore::ensure_exists(path).await {
            warn!(path = %path.display(), error = %e, "Could not create tracker file");
        }
    }
}

/// Delete both tracker files after a completed run
///
/// Returns false if any tracker could not be removed.
pub async fn cleanup_trackers(tracker: &TrackerConfig) -> bool {
    let mut cleared = true;
    for path in tracker.paths() {
        match CompletionStore::remove(path).await {
            Ok(true) => info!(path = %path.display(), "Removed tracker file"),
            Ok(false) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not remove tracker file");
                cleared = false;
            }
        }
    }
    cleared
}

/// Run the whole download process
///
/// `on_start` is called once the catalog has been filtered and before any
/// item is dispatched, with the plan and a subscription to engine events.
/// It is not called when the run aborts earlier.
///
/// # Errors
/// Returns error if the config is invalid or the catalog cannot be read. In
/// that case no downloads are attempted and the tracker files are kept.
pub async fn run<F>(config: Config, on_start: F) -> Result<RunSummary>
where
    F: FnOnce(&RunPlan, broadcast::Receiver<Event>),
{
    config.validate()?;
    prepare_environment(&config).await;

    let stores = Arc::new(CompletionStores::load(&config.tracker).await);
    let (cached_cards, cached_fields) = (stores.card.len().await, stores.field.len().await);
    info!(
        cards = cached_cards,
        fields = cached_fields,
        "Loaded cached IDs"
    );

    let catalog = CatalogClient::new(&config)?;
    let candidates = catalog.resolve().await?;

    let pending = stores.pending(&candidates).await;
    info!(pending = pending.len(), "Filtered already downloaded images");

    let plan = RunPlan {
        card_candidates: candidates.cards.len(),
        field_candidates: candidates.fields.len(),
        pending: pending.len(),
    };
    let tracker = config.tracker.clone();
    let downloader = Downloader::new(config, stores)?;
    on_start(&plan, downloader.subscribe());

    // an empty list returns without touching the network
    let report = downloader.run_with_report(pending).await;
    // dropping the downloader closes the event channel for subscribers
    drop(downloader);
    let trackers_cleared = cleanup_trackers(&tracker).await;

    Ok(RunSummary {
        card_candidates: plan.card_candidates,
        field_candidates: plan.field_candidates,
        attempted: plan.pending,
        report,
        trackers_cleared,
    })
}
