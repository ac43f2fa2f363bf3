//! Card catalog client
//!
//! Resolves the candidate identifier lists from the remote card database.
//! Any failure here is fatal to the run: nothing is downloaded and the
//! tracker files are left in place for the next attempt.

use crate::config::Config;
use crate::error::{CatalogError, Result};
use crate::types::ItemId;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct CatalogImage {
    #[serde(default)]
    id: u64,
}

#[derive(Debug, Deserialize)]
struct CatalogCard {
    #[serde(default)]
    card_images: Vec<CatalogImage>,
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    data: Vec<CatalogCard>,
}

impl CatalogResponse {
    /// Flatten every non-zero image id, in response order
    fn into_ids(self) -> Vec<ItemId> {
        self.data
            .into_iter()
            .flat_map(|card| card.card_images)
            .filter_map(|image| ItemId::new(image.id))
            .collect()
    }
}

/// Candidate identifiers for one run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Candidates {
    /// Every card image id
    pub cards: Vec<ItemId>,
    /// Field-spell image ids
    pub fields: Vec<ItemId>,
}

/// HTTP client for the card catalog
#[derive(Clone, Debug)]
pub struct CatalogClient {
    http_client: reqwest::Client,
    api_url: String,
    field_filter: BTreeMap<String, String>,
}

impl CatalogClient {
    /// Create a catalog client from the run configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.download.request_timeout)
            .connect_timeout(config.download.connect_timeout)
            .user_agent(config.download.user_agent.as_str())
            .build()?;

        Ok(Self {
            http_client,
            api_url: config.catalog.api_url.clone(),
            field_filter: config.catalog.field_filter.clone(),
        })
    }

    /// Query the catalog and extract every non-zero image id
    pub async fn fetch_ids(
        &self,
        params: &BTreeMap<String, String>,
    ) -> std::result::Result<Vec<ItemId>, CatalogError> {
        let mut url =
            reqwest::Url::parse(&self.api_url).map_err(|e| CatalogError::InvalidUrl {
                url: self.api_url.clone(),
                reason: e.to_string(),
            })?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter());
        }
        let url_str = url.to_string();
        debug!(url = %url_str, "Querying catalog");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|source| CatalogError::Request {
                url: url_str.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| CatalogError::Body {
                url: url_str.clone(),
                source,
            })?;

        if status != reqwest::StatusCode::OK {
            return Err(CatalogError::Status {
                code: status.as_u16(),
                url: url_str,
                body,
            });
        }

        let parsed: CatalogResponse =
            serde_json::from_str(&body).map_err(|source| CatalogError::Parse {
                url: url_str,
                source,
            })?;

        Ok(parsed.into_ids())
    }

    /// Every card image id (unfiltered query)
    pub async fn all_card_ids(&self) -> std::result::Result<Vec<ItemId>, CatalogError> {
        info!("Fetching all card IDs from API");
        self.fetch_ids(&BTreeMap::new()).await
    }

    /// Field-spell image ids (filtered query)
    pub async fn field_ids(&self) -> std::result::Result<Vec<ItemId>, CatalogError> {
        info!("Fetching all field spell IDs from API");
        self.fetch_ids(&self.field_filter).await
    }

    /// Run both catalog queries concurrently
    ///
    /// Fails as soon as either query fails.
    pub async fn resolve(&self) -> std::result::Result<Candidates, CatalogError> {
        let (cards, fields) = tokio::try_join!(self.all_card_ids(), self.field_ids())?;
        info!(
            cards = cards.len(),
            fields = fields.len(),
            "Resolved catalog candidates"
        );
        Ok(Candidates { cards, fields })
    }
}
