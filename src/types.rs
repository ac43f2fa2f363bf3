//! Core types and events for ygo-hd-dl

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Upstream identifier of a single downloadable image
///
/// Identifiers are strictly positive; the catalog uses `0` as a placeholder
/// for "no image", which never becomes an `ItemId`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    /// Create an ItemId, rejecting the zero placeholder
    pub fn new(id: u64) -> Option<Self> {
        if id == 0 { None } else { Some(Self(id)) }
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<u64> for ItemId {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

/// Which image family an item belongs to
///
/// The variant selects the URL shape, the output directory and the
/// completion tracker the item is recorded in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Full card artwork
    Plain,
    /// Cropped field-spell artwork
    Field,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Plain => f.write_str("card"),
            Variant::Field => f.write_str("field"),
        }
    }
}

/// One unit of work for the download engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorkItem {
    /// Upstream identifier (always used for the fetch URL)
    pub id: ItemId,
    /// Image family
    pub variant: Variant,
}

impl WorkItem {
    /// Plain card item
    pub fn plain(id: ItemId) -> Self {
        Self {
            id,
            variant: Variant::Plain,
        }
    }

    /// Field-spell item
    pub fn field(id: ItemId) -> Self {
        Self {
            id,
            variant: Variant::Field,
        }
    }
}

/// Result of a single fetch attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Payload written to disk
    Success,
    /// Server answered with a non-2xx status
    HttpStatus(u16),
    /// Connection, timeout, or local filesystem failure
    Transport(String),
}

impl DownloadOutcome {
    /// True for [`DownloadOutcome::Success`]
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Success)
    }
}

/// Events emitted by the downloader
///
/// Subscribe with [`crate::Downloader::subscribe`]. Slow subscribers may observe
/// `RecvError::Lagged`; progress events are periodic, so dropping some is harmless.
#[derive(Clone, Debug)]
pub enum Event {
    /// Periodic progress sample
    Progress(ProgressSnapshot),

    /// A single item finished (successfully or not)
    ItemFinished {
        /// The item that finished
        item: WorkItem,
        /// How it finished
        outcome: DownloadOutcome,
    },
}

/// Point-in-time view of a running download
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressSnapshot {
    /// Items finished so far (any outcome)
    pub processed: u64,
    /// Items submitted for this run
    pub total: u64,
    /// Items written successfully
    pub succeeded: u64,
    /// Time since the run started
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Share of items processed, 0-100
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.processed as f64 * 100.0 / self.total as f64
    }

    /// Successful images per second since start
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.succeeded as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed: {}/{} ({:.2}%) - Successful: {} - Speed: {:.2} img/s",
            self.processed,
            self.total,
            self.percent(),
            self.succeeded,
            self.rate()
        )
    }
}

/// Final tally of one engine run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunReport {
    /// Items submitted
    pub total: u64,
    /// Items that finished (equals `total` once the run returns)
    pub processed: u64,
    /// Items written to disk
    pub succeeded: u64,
    /// Items rejected with a non-2xx status
    pub http_failures: u64,
    /// Items lost to transport or filesystem errors
    pub other_failures: u64,
    /// Highest number of fetches observed in flight at once
    pub peak_in_flight: u64,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl RunReport {
    /// Every item was accounted for in exactly one outcome bucket
    pub fn is_complete(&self) -> bool {
        self.processed == self.total
            && self.succeeded + self.http_failures + self.other_failures == self.processed
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Download process finished. Processed: {}/{}. Successful: {}.",
            self.processed, self.total, self.succeeded
        )?;
        if self.other_failures > 0 {
            write!(
                f,
                "\n{} downloads failed due to non-HTTP errors.",
                self.other_failures
            )?;
        }
        if self.http_failures > 0 {
            write!(
                f,
                "\n{} downloads failed due to HTTP errors.",
                self.http_failures
            )?;
        }
        Ok(())
    }
}
