//! Append-only completion trackers
//!
//! Each variant has its own tracker file holding one completed identifier per
//! line. The file is loaded once at startup and appended to as items finish,
//! so an interrupted run can resume without re-fetching what it already has.
//! Appends to one tracker are serialised by a lock private to that tracker;
//! the two trackers never contend with each other.

use crate::catalog::Candidates;
use crate::config::TrackerConfig;
use crate::error::StoreError;
use crate::types::{ItemId, Variant, WorkItem};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Durable set of identifiers already downloaded for one variant
#[derive(Debug)]
pub struct CompletionStore {
    path: PathBuf,
    ids: Mutex<HashSet<String>>,
}

impl CompletionStore {
    /// Load a tracker file
    ///
    /// A missing file is an empty store. An unreadable file is logged and
    /// also treated as empty; the worst case is a redundant download.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ids = match tokio::fs::read_to_string(&path).await {
            Ok(text) => parse_ids(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Error reading tracker file, assuming empty");
                HashSet::new()
            }
        };
        debug!(path = %path.display(), count = ids.len(), "Loaded tracker file");

        Self {
            path,
            ids: Mutex::new(ids),
        }
    }

    /// Tracker file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of recorded identifiers
    pub async fn len(&self) -> usize {
        self.ids.lock().await.len()
    }

    /// True when nothing has been recorded
    pub async fn is_empty(&self) -> bool {
        self.ids.lock().await.is_empty()
    }

    /// Whether `id` has already been downloaded
    pub async fn contains(&self, id: &ItemId) -> bool {
        self.ids.lock().await.contains(&id.to_string())
    }

    /// Record `id` as downloaded
    ///
    /// Appends one line to the tracker file while holding this store's lock.
    /// Recording an identifier twice is a no-op.
    pub async fn add(&self, id: &ItemId) -> Result<(), StoreError> {
        let key = id.to_string();
        let mut ids = self.ids.lock().await;
        if ids.contains(&key) {
            return Ok(());
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|source| StoreError::Open {
                path: self.path.clone(),
                source,
            })?;

        let line = format!("{key}\n");
        let write = async {
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        };
        write.await.map_err(|source| StoreError::Append {
            id: key.clone(),
            path: self.path.clone(),
            source,
        })?;

        ids.insert(key);
        Ok(())
    }

    /// Create the tracker file if it does not exist yet
    pub async fn ensure_exists(path: &Path) -> std::io::Result<()> {
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map(|_| ())
    }

    /// Delete the tracker file; a missing file is not an error
    ///
    /// Returns `true` if a file was removed.
    pub async fn remove(path: &Path) -> std::io::Result<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn parse_ids(text: &str) -> HashSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// The pair of per-variant trackers
#[derive(Debug)]
pub struct CompletionStores {
    /// Plain card tracker
    pub card: CompletionStore,
    /// Field image tracker
    pub field: CompletionStore,
}

impl CompletionStores {
    /// Load both trackers concurrently
    pub async fn load(config: &TrackerConfig) -> Self {
        let (card, field) = tokio::join!(
            CompletionStore::load(&config.card_path),
            CompletionStore::load(&config.field_path)
        );
        Self { card, field }
    }

    /// Tracker for a variant
    pub fn for_variant(&self, variant: Variant) -> &CompletionStore {
        match variant {
            Variant::Plain => &self.card,
            Variant::Field => &self.field,
        }
    }

    /// Work items not yet recorded as complete
    ///
    /// Card items come first, then field items, each in candidate order.
    pub async fn pending(&self, candidates: &Candidates) -> Vec<WorkItem> {
        let mut items = Vec::with_capacity(candidates.cards.len() + candidates.fields.len());
        let groups = [
            (Variant::Plain, &candidates.cards),
            (Variant::Field, &candidates.fields),
        ];
        for (variant, ids) in groups {
            let store = self.for_variant(variant);
            for id in ids {
                if !store.contains(id).await {
                    items.push(WorkItem { id: *id, variant });
                }
            }
        }
        items
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn id(raw: u64) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CompletionStore::load(dir.path().join("absent.tmp")).await;

        assert!(store.is_empty().await);
        assert!(!store.contains(&id(10)).await);
    }

    #[tokio::test]
    async fn load_ignores_blank_lines_and_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cards.tmp");
        std::fs::write(&path, "10\n\n  20  \n\t\n30").unwrap();

        let store = CompletionStore::load(&path).await;

        assert_eq!(store.len().await, 3);
        assert!(store.contains(&id(20)).await);
        assert!(store.contains(&id(30)).await);
    }

    #[tokio::test]
    async fn added_ids_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cards.tmp");
        CompletionStore::ensure_exists(&path).await.unwrap();

        let store = CompletionStore::load(&path).await;
        for raw in [10, 20, 31533705] {
            store.add(&id(raw)).await.unwrap();
        }

        let reloaded = CompletionStore::load(&path).await;
        for raw in [10, 20, 31533705] {
            assert!(reloaded.contains(&id(raw)).await, "{raw} missing after reload");
        }
        assert!(!reloaded.contains(&id(40)).await);
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cards.tmp");
        let store = CompletionStore::load(&path).await;

        store.add(&id(10)).await.unwrap();
        store.add(&id(10)).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "10\n");
    }

    #[tokio::test]
    async fn concurrent_adds_write_whole_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cards.tmp");
        let store = Arc::new(CompletionStore::load(&path).await);

        let mut tasks = tokio::task::JoinSet::new();
        for raw in 1..=200u64 {
            let store = Arc::clone(&store);
            tasks.spawn(async move { store.add(&id(raw)).await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines: Vec<u64> = text.lines().map(|l| l.parse().unwrap()).collect();
        lines.sort_unstable();
        assert_eq!(lines, (1..=200).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn add_reports_unwritable_tracker() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be opened for appending
        let store = CompletionStore::load(dir.path()).await;

        let err = store.add(&id(10)).await.unwrap_err();
        assert!(matches!(err, StoreError::Open { .. }));
        assert!(!store.contains(&id(10)).await);
    }

    #[tokio::test]
    async fn remove_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cards.tmp");

        assert!(!CompletionStore::remove(&path).await.unwrap());
        CompletionStore::ensure_exists(&path).await.unwrap();
        assert!(CompletionStore::remove(&path).await.unwrap());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn pending_filters_per_variant() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrackerConfig {
            card_path: dir.path().join("cards.tmp"),
            field_path: dir.path().join("fields.tmp"),
        };
        std::fs::write(&config.card_path, "10\n").unwrap();
        std::fs::write(&config.field_path, "30\n").unwrap();

        let stores = CompletionStores::load(&config).await;
        let candidates = Candidates {
            cards: vec![id(10), id(20), id(30)],
            fields: vec![id(10), id(30)],
        };

        let pending = stores.pending(&candidates).await;

        assert_eq!(
            pending,
            vec![
                WorkItem::plain(id(20)),
                WorkItem::plain(id(30)),
                WorkItem::field(id(10)),
            ]
        );
    }
}
