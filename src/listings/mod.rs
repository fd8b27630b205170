//! Listing search pipeline.
//!
//! Builds the search URL, fetches the results page and extracts
//! apartment postings from it.

mod extractor;
mod fetcher;

use std::fmt;

use async_trait::async_trait;

pub use extractor::{ExtractError, ListingExtractor, extract_candidates, extract_listings};
pub use fetcher::{FetchError, ImmoweltSource};

/// One extracted apartment posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub title: String,
    pub price: String,
    /// Absolute link to the listing detail page.
    pub url: String,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}\n{}", self.title, self.price, self.url)
    }
}

/// Search criteria taken from a `/filter` command.
///
/// `min_price <= max_price` is not enforced; the site decides what an
/// inverted range means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    pub city: String,
    pub min_price: i64,
    pub max_price: i64,
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-{}", self.city, self.min_price, self.max_price)
    }
}

/// Source of listings for a search filter.
///
/// Implementations fail softly: transport problems are logged and reported
/// as an empty result.
#[async_trait]
pub trait ListingSource: Send + Sync + fmt::Debug {
    /// Returns all listings found for the filter, in page order.
    async fn search(&self, filter: &SearchFilter) -> Vec<Listing>;
}
