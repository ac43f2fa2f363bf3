//! Common test utilities for ygo-hd-dl end-to-end tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};
use ygo_hd_dl::Config;
use ygo_hd_dl::config::TrackerConfig;

/// Minimal JPEG-looking payload served for every successful image
pub const JPEG_BODY: &[u8] = b"\xFF\xD8\xFF\xE0e2e-payload\xFF\xD9";

/// Catalog endpoint path on the mock server
pub const CATALOG_PATH: &str = "/api/v7/cardinfo.php";

/// Temporary workspace plus a config pointing every path and URL at it
pub struct TestEnv {
    pub dir: TempDir,
    pub config: Config,
}

impl TestEnv {
    pub fn new(server: &MockServer) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = Config::default();
        config.catalog.api_url = format!("{}{}", server.uri(), CATALOG_PATH);
        config.images.base_url = format!("{}/images/cards", server.uri());
        config.images.pics_dir = dir.path().join("pics");
        config.images.field_pics_dir = dir.path().join("pics").join("field");
        config.tracker = TrackerConfig {
            card_path: dir.path().join("hd_cards_downloader_tracker.tmp"),
            field_path: dir.path().join("hd_fields_downloader_tracker.tmp"),
        };
        config.download.concurrency = 4;
        config.download.progress_interval = std::time::Duration::from_millis(20);
        Self { dir, config }
    }

    pub fn pic(&self, name: &str) -> PathBuf {
        self.config.images.pics_dir.join(name)
    }

    pub fn field_pic(&self, name: &str) -> PathBuf {
        self.config.images.field_pics_dir.join(name)
    }

    pub fn card_tracker(&self) -> &Path {
        &self.config.tracker.card_path
    }

    pub fn field_tracker(&self) -> &Path {
        &self.config.tracker.field_path
    }
}

fn catalog_body(ids: &[u64]) -> serde_json::Value {
    let data: Vec<_> = ids
        .iter()
        .map(|id| serde_json::json!({ "card_images": [ { "id": id } ] }))
        .collect();
    serde_json::json!({ "data": data })
}

/// Serve the unfiltered and field-filtered catalog queries
pub async fn mount_catalog(server: &MockServer, cards: &[u64], fields: &[u64]) {
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(query_param("race", "field"))
        .and(query_param("type", "spell card"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body(fields)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(query_param_is_missing("race"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body(cards)))
        .mount(server)
        .await;
}

/// Serve one image path with the given status
pub async fn mount_image(server: &MockServer, url_path: &str, status: u16) {
    let template = if (200..300).contains(&status) {
        ResponseTemplate::new(status).set_body_bytes(JPEG_BODY)
    } else {
        ResponseTemplate::new(status)
    };
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(template)
        .mount(server)
        .await;
}
