//! Command-line entry point: downloads every missing HD card and field image.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use ygo_hd_dl::{Config, Event};

/// Width the progress line is padded to, so shorter lines fully overwrite longer ones
const PROGRESS_LINE_WIDTH: usize = 75;

#[derive(Debug, Parser)]
#[command(name = "ygo-hd-dl", version, about = "Download all missing HD card and field artwork")]
struct Cli {
    /// TOML config file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum concurrent downloads
    #[arg(long)]
    concurrency: Option<usize>,

    /// Output directory for card images
    #[arg(long)]
    pics_dir: Option<PathBuf>,

    /// Output directory for field images
    #[arg(long)]
    field_pics_dir: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log per-item failures
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> ygo_hd_dl::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_toml_file(path)?,
            None => Config::default(),
        };
        if let Some(concurrency) = self.concurrency {
            config.download.concurrency = concurrency;
        }
        if let Some(dir) = self.pics_dir {
            config.images.pics_dir = dir;
        }
        if let Some(dir) = self.field_pics_dir {
            config.images.field_pics_dir = dir;
        }
        if let Some(secs) = self.timeout_secs {
            config.download.request_timeout = Duration::from_secs(secs);
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "ygo_hd_dl=debug,warn" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

/// Render progress samples as one overwritten stdout line until the channel closes
///
/// Resolves to the number of lines drawn.
fn spawn_progress_printer(mut events: broadcast::Receiver<Event>) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut drawn = 0;
        loop {
            match events.recv().await {
                Ok(Event::Progress(snapshot)) => {
                    let line = snapshot.to_string();
                    print!("{line:<width$}\r", width = PROGRESS_LINE_WIDTH);
                    std::io::stdout().flush().ok();
                    drawn += 1;
                }
                Ok(_) => {}
                // samples are periodic, skipping missed ones is fine
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        drawn
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let started = Instant::now();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    println!("EDOPro HD v{}", env!("CARGO_PKG_VERSION"));
    println!("Automatically downloading all missing cards and fields...");
    let concurrency = config.download.concurrency;

    let mut printer = None;
    let result = ygo_hd_dl::app::run(config, |plan, events| {
        println!(
            "Found {} cards and {} fields from API.",
            plan.card_candidates, plan.field_candidates
        );
        if plan.pending > 0 {
            println!(
                "Starting download of {} images (Concurrency: {})...",
                plan.pending, concurrency
            );
            printer = Some(spawn_progress_printer(events));
        }
    })
    .await;

    // the event channel is closed by now; let the last progress line land
    if let Some(printer) = printer
        && let Err(e) = printer.await
    {
        tracing::error!(error = %e, "Progress printer panicked");
    }

    let code = match result {
        Ok(summary) => {
            if summary.attempted == 0 {
                println!("No new images to download. Everything is up to date!");
            } else {
                println!("\n{}", summary.report);
                println!(
                    "Download Summary: Attempted: {}. HTTP errors (e.g., 404s): {}.",
                    summary.attempted, summary.report.http_failures
                );
            }
            if summary.trackers_cleared {
                println!("Temporary tracking files cleaned up.");
            } else {
                println!("Some tracking files could not be removed; see the log for details.");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Download run aborted");
            println!("\nTracking files kept due to an error during the process.");
            ExitCode::FAILURE
        }
    };

    println!("\nProcess finished in {:.3?}.", started.elapsed());
    code
}
