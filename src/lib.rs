//! # ygo-hd-dl
//!
//! Resumable bulk downloader for HD card artwork.
//!
//! ## Design
//!
//! - **Resumable** - every finished image is appended to a per-variant tracker
//!   file, so an interrupted run picks up where it stopped
//! - **Bounded** - a semaphore caps in-flight fetches regardless of list size
//! - **Failure-local** - one bad image never aborts the others; only a catalog
//!   failure stops the run
//! - **Event-driven** - progress is published on a broadcast channel, workers
//!   never wait on the reporter
//!
//! ## Quick Start
//!
//! ```no_run
//! use ygo_hd_dl::{Config, Event};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let summary = ygo_hd_dl::app::run(Config::default(), |plan, mut events| {
//!         println!("{} images to download", plan.pending);
//!         tokio::spawn(async move {
//!             while let Ok(event) = events.recv().await {
//!                 if let Event::Progress(snapshot) = event {
//!                     print!("{snapshot}\r");
//!                 }
//!             }
//!         });
//!     })
//!     .await?;
//!
//!     println!("{}", summary.report);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Process orchestration
pub mod app;
/// Remote card catalog client
pub mod catalog;
/// Append-only completion trackers
pub mod completion_store;
/// Configuration types
pub mod config;
/// Concurrent download engine
pub mod downloader;
/// Error types
pub mod error;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use catalog::{Candidates, CatalogClient};
pub use completion_store::{CompletionStore, CompletionStores};
pub use config::Config;
pub use downloader::Downloader;
pub use error::{CatalogError, Error, FetchError, Result, StoreError};
pub use types::{
    DownloadOutcome, Event, ItemId, ProgressSnapshot, RunReport, Variant, WorkItem,
};
