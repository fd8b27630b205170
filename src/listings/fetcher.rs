//! Listing site client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, error, info};

use super::{Listing, ListingExtractor, ListingSource, SearchFilter};
use crate::config::SearchSettings;

/// Errors that can occur while fetching a results page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid search URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Listing site answered {status} for {url}")]
    Status { status: StatusCode, url: String },
}

/// Searches immowelt rental listings.
#[derive(Debug, Clone)]
pub struct ImmoweltSource {
    client: Client,
    base_url: Url,
    extractor: ListingExtractor,
}

impl ImmoweltSource {
    /// Creates a source with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the client cannot be built.
    pub fn new(settings: &SearchSettings) -> Result<Self, FetchError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {e}", settings.base_url)))?;

        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(settings.base_url.clone()));
        }

        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout())
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            base_url,
            extractor: ListingExtractor::new(settings.base_url.as_str()),
        })
    }

    /// Builds `{base}/liste/{city}/wohnungen/mieten?price={min}-{max}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path.
    pub fn search_url(&self, filter: &SearchFilter) -> Result<Url, FetchError> {
        // Dot segments would be normalised away and drop the city.
        if matches!(filter.city.as_str(), "" | "." | "..") {
            return Err(FetchError::InvalidUrl(format!("city '{}'", filter.city)));
        }

        let mut url = self.base_url.clone();

        url.path_segments_mut()
            .map_err(|()| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["liste", filter.city.as_str(), "wohnungen", "mieten"]);

        url.query_pairs_mut()
            .clear()
            .append_pair("price", &format!("{}-{}", filter.min_price, filter.max_price));

        Ok(url)
    }

    /// Fetches the raw results page for the filter.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout or a non-2xx status.
    pub async fn fetch_html(&self, filter: &SearchFilter) -> Result<String, FetchError> {
        let url = self.search_url(filter)?;
        debug!("Fetching {}", url);

        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl ListingSource for ImmoweltSource {
    async fn search(&self, filter: &SearchFilter) -> Vec<Listing> {
        match self.fetch_html(filter).await {
            Ok(html) => {
                let listings = self.extractor.extract_listings(&html);
                info!("Search '{}' returned {} listings", filter, listings.len());
                listings
            }
            Err(e) => {
                error!("Listing search '{}' failed: {}", filter, e);
                Vec::new()
            }
        }
    }
}
