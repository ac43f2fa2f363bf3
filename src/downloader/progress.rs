//! Background progress reporter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::types::{Event, ProgressSnapshot};

use super::context::EngineCounters;

/// Samples taken sooner than this after start are dropped as noise
const MIN_SAMPLE_ELAPSED: Duration = Duration::from_millis(100);

/// Parameters for spawning a progress reporter background task
pub(crate) struct ProgressReporterParams {
    /// Items submitted for this run
    pub total: u64,
    /// Run start time
    pub started: Instant,
    /// Sampling interval
    pub interval: Duration,
    /// Counters shared with the workers
    pub counters: Arc<EngineCounters>,
    /// Event broadcast sender
    pub event_tx: broadcast::Sender<Event>,
    /// Stop signal, fired once every worker has finished
    pub cancel_token: CancellationToken,
}

/// Build a snapshot, or `None` while there is nothing meaningful to report.
pub(crate) fn sample(
    counters: &EngineCounters,
    total: u64,
    elapsed: Duration,
) -> Option<ProgressSnapshot> {
    let processed = counters.processed();
    if processed == 0 || elapsed < MIN_SAMPLE_ELAPSED {
        return None;
    }
    Some(ProgressSnapshot {
        processed,
        total,
        succeeded: counters.succeeded(),
        elapsed,
    })
}

/// Spawn a background task that periodically publishes [`Event::Progress`].
///
/// The task never touches worker state beyond reading counters, and stops
/// as soon as `cancel_token` fires.
pub(crate) fn spawn_progress_reporter(
    params: ProgressReporterParams,
) -> tokio::task::JoinHandle<()> {
    let ProgressReporterParams {
        total,
        started,
        interval,
        counters,
        event_tx,
        cancel_token,
    } = params;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    break;
                }
                _ = interval.tick() => {
                    if let Some(snapshot) = sample(&counters, total, started.elapsed()) {
                        event_tx.send(Event::Progress(snapshot)).ok();
                    }
                }
            }
        }
    })
}
