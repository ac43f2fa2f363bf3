//! Configuration types for ygo-hd-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, path::PathBuf, time::Duration};

/// Default User-Agent / client identification
pub const USER_AGENT: &str = concat!("ygo-hd-dl/", env!("CARGO_PKG_VERSION"));

/// Remote catalog settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Card info endpoint (default: YGOProDeck v7 cardinfo)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Query parameters selecting field-spell cards (default: type=spell card, race=field)
    #[serde(default = "default_field_filter")]
    pub field_filter: BTreeMap<String, String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            field_filter: default_field_filter(),
        }
    }
}

/// Image source and output locations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Base URL for card images; field images live under `{base_url}_cropped`
    #[serde(default = "default_images_base_url")]
    pub base_url: String,

    /// Output directory for plain card images (default: "./pics")
    #[serde(default = "default_pics_dir")]
    pub pics_dir: PathBuf,

    /// Output directory for field images (default: "./pics/field")
    #[serde(default = "default_field_pics_dir")]
    pub field_pics_dir: PathBuf,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base_url: default_images_base_url(),
            pics_dir: default_pics_dir(),
            field_pics_dir: default_field_pics_dir(),
        }
    }
}

/// Download engine behaviour
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Maximum concurrent in-flight fetches (default: 100)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Whole-request timeout, in seconds (default: 30)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// TCP connect timeout, in seconds (default: 30)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Interval between progress samples, in milliseconds (default: 200)
    #[serde(default = "default_progress_interval", with = "duration_ms_serde")]
    pub progress_interval: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
            progress_interval: default_progress_interval(),
        }
    }
}

/// Completion tracker files used to resume interrupted runs
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Tracker for plain card images
    #[serde(default = "default_card_tracker")]
    pub card_path: PathBuf,

    /// Tracker for field images
    #[serde(default = "default_field_tracker")]
    pub field_path: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            card_path: default_card_tracker(),
            field_path: default_field_tracker(),
        }
    }
}

impl TrackerConfig {
    /// Both tracker paths
    pub fn paths(&self) -> [&Path; 2] {
        [&self.card_path, &self.field_path]
    }
}

/// Main configuration for ygo-hd-dl
///
/// Every field has a default, so an empty TOML file is a valid config.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Catalog endpoint and filters
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Image source and output directories
    #[serde(default)]
    pub images: ImageConfig,

    /// Engine settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Resume tracker files
    #[serde(default)]
    pub tracker: TrackerConfig,
}

impl Config {
    /// Load a config from a TOML file, then validate it
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.concurrency == 0 {
            return Err(Error::config(
                "download.concurrency",
                "concurrency must be at least 1",
            ));
        }
        if self.catalog.api_url.trim().is_empty() {
            return Err(Error::config("catalog.api_url", "API URL must not be empty"));
        }
        if self.images.base_url.trim().is_empty() {
            return Err(Error::config(
                "images.base_url",
                "image base URL must not be empty",
            ));
        }
        if self.download.progress_interval.is_zero() {
            return Err(Error::config(
                "download.progress_interval",
                "progress interval must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Directories that must exist before downloading
    pub fn required_dirs(&self) -> [&Path; 2] {
        [&self.images.pics_dir, &self.images.field_pics_dir]
    }
}

fn default_api_url() -> String {
    "https://db.ygoprodeck.com/api/v7/cardinfo.php".to_string()
}

fn default_field_filter() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("type".to_string(), "spell card".to_string()),
        ("race".to_string(), "field".to_string()),
    ])
}

fn default_images_base_url() -> String {
    "https://images.ygoprodeck.com/images/cards".to_string()
}

fn default_pics_dir() -> PathBuf {
    PathBuf::from("./pics")
}

fn default_field_pics_dir() -> PathBuf {
    PathBuf::from("./pics/field")
}

fn default_concurrency() -> usize {
    100
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

fn default_progress_interval() -> Duration {
    Duration::from_millis(200)
}

fn default_card_tracker() -> PathBuf {
    PathBuf::from("./hd_cards_downloader_tracker.tmp")
}

fn default_field_tracker() -> PathBuf {
    PathBuf::from("./hd_fields_downloader_tracker.tmp")
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration serialization helper
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
