//! Single-item fetch: request, classify, stream to disk, record completion.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWriteExt;

use crate::error::FetchError;
use crate::types::{DownloadOutcome, Event, WorkItem};

use super::context::RunContext;
use super::target::DownloadTarget;

/// Suffix counter keeping scratch file names unique within the process
static PART_SEQ: AtomicU64 = AtomicU64::new(0);

/// Download one item and account for the result.
///
/// Always records exactly one outcome in the run counters, and appends the
/// item to its completion tracker on success.
pub(super) async fn process_item(ctx: &RunContext, item: WorkItem) -> DownloadOutcome {
    let _in_flight = ctx.counters.enter();
    let target = DownloadTarget::for_item(&ctx.images, &item);

    let outcome = match fetch_item(&ctx.http_client, &target).await {
        Ok(()) => {
            record_completion(ctx, &item).await;
            DownloadOutcome::Success
        }
        Err(e) => {
            if e.is_timeout() {
                tracing::debug!(item_id = %item.id, variant = %item.variant, url = %target.url, "Download timed out");
            } else {
                tracing::debug!(item_id = %item.id, variant = %item.variant, error = %e, "Download failed");
            }
            e.outcome()
        }
    };

    ctx.counters.record(&outcome);
    ctx.event_tx
        .send(Event::ItemFinished {
            item,
            outcome: outcome.clone(),
        })
        .ok();
    outcome
}

/// Append a finished item to its tracker.
///
/// A failed append only risks a redundant download on a later run, so it is
/// logged and the item still counts as a success.
async fn record_completion(ctx: &RunContext, item: &WorkItem) {
    let store = ctx.stores.for_variant(item.variant);
    if let Err(e) = store.add(&item.id).await {
        tracing::warn!(
            item_id = %item.id,
            tracker = %store.path().display(),
            error = %e,
            "Failed to record completed download"
        );
    }
}

/// Fetch `target.url` into `target.path`.
///
/// The body is streamed into a uniquely named `.part` file next to the
/// destination and renamed over it only after a complete write, so
/// concurrent fetches of the same name never interleave and a failed fetch
/// never leaves a truncated image behind.
pub(super) async fn fetch_item(
    client: &reqwest::Client,
    target: &DownloadTarget,
) -> Result<(), FetchError> {
    tokio::fs::create_dir_all(&target.dir)
        .await
        .map_err(|source| FetchError::CreateDir {
            path: target.dir.clone(),
            source,
        })?;

    let mut response = client
        .get(&target.url)
        .send()
        .await
        .map_err(|source| FetchError::Request {
            url: target.url.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            code: status.as_u16(),
            url: target.url.clone(),
        });
    }

    let part = part_path(target);
    let mut file = tokio::fs::File::create(&part)
        .await
        .map_err(|source| FetchError::Write {
            path: part.clone(),
            source,
        })?;

    let copied = copy_body(&mut response, &mut file, target, &part).await;
    drop(file);
    let committed = match copied {
        Ok(()) => tokio::fs::rename(&part, &target.path)
            .await
            .map_err(|source| FetchError::Write {
                path: target.path.clone(),
                source,
            }),
        Err(e) => Err(e),
    };
    if committed.is_err() {
        remove_partial(&part).await;
    }
    committed
}

/// Unique scratch file in the destination directory
fn part_path(target: &DownloadTarget) -> PathBuf {
    let seq = PART_SEQ.fetch_add(1, Ordering::Relaxed);
    let name = target
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    target
        .dir
        .join(format!(".{name}.{}-{seq}.part", std::process::id()))
}

/// Stream the response body into `file` chunk by chunk.
async fn copy_body(
    response: &mut reqwest::Response,
    file: &mut tokio::fs::File,
    target: &DownloadTarget,
    part: &Path,
) -> Result<(), FetchError> {
    let write_err = |source| FetchError::Write {
        path: part.to_path_buf(),
        source,
    };

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|source| FetchError::Request {
            url: target.url.clone(),
            source,
        })?
    {
        file.write_all(&chunk).await.map_err(write_err)?;
    }
    // tokio buffers writes; flushing surfaces any deferred I/O error
    file.flush().await.map_err(write_err)?;
    Ok(())
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial download");
        }
    }
}
