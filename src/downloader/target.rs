//! Where an item is fetched from and where it lands on disk.

use std::path::PathBuf;

use crate::config::ImageConfig;
use crate::types::{ItemId, Variant, WorkItem};

/// Upstream ids whose artwork must be stored under a different name.
///
/// The fetch always uses the upstream id; only the file name changes.
const ID_CORRECTIONS: &[(u64, u64)] = &[(904186, 31533705)];

/// Identifier used for the stored file name
pub fn corrected_id(id: ItemId) -> ItemId {
    ID_CORRECTIONS
        .iter()
        .find(|(from, _)| id == *from)
        .and_then(|(_, to)| ItemId::new(*to))
        .unwrap_or(id)
}

/// Resolved source URL and destination path for one item
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Image URL
    pub url: String,
    /// Destination directory
    pub dir: PathBuf,
    /// Destination file
    pub path: PathBuf,
}

impl DownloadTarget {
    /// Resolve the target for `item`
    pub fn for_item(images: &ImageConfig, item: &WorkItem) -> Self {
        let base = images.base_url.trim_end_matches('/');
        let (url, dir) = match item.variant {
            Variant::Plain => (format!("{base}/{}.jpg", item.id), &images.pics_dir),
            Variant::Field => (
                format!("{base}_cropped/{}.jpg", item.id),
                &images.field_pics_dir,
            ),
        };
        let path = dir.join(format!("{}.jpg", corrected_id(item.id)));

        Self {
            url,
            dir: dir.clone(),
            path,
        }
    }
}
