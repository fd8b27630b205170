//! HTML extraction of listing blocks.
//!
//! Every `.EstateItem` block is turned into a tagged result. Blocks missing
//! a title, price or link are reported and skipped; they never abort the
//! rest of the page.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, warn};

use super::Listing;

/// Compiled selectors for the listing page layout.
struct ListingSelectors {
    item: Selector,
    title: Selector,
    price: Selector,
    link: Selector,
}

// Selector literals are constant, so parsing them cannot fail at runtime.
#[allow(clippy::expect_used)]
static SELECTORS: LazyLock<ListingSelectors> = LazyLock::new(|| ListingSelectors {
    item: Selector::parse(".EstateItem").expect("valid item selector"),
    title: Selector::parse(".EstateTitle").expect("valid title selector"),
    price: Selector::parse(".EstatePrice").expect("valid price selector"),
    link: Selector::parse("a").expect("valid link selector"),
});

/// A listing block that could not be turned into a [`Listing`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("listing block #{index} has no {field}")]
    MissingField { index: usize, field: &'static str },
}

/// Extracts listings from result pages of one site.
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    /// Prefix for relative listing links, without a trailing slash.
    domain: String,
}

impl ListingExtractor {
    /// Creates an extractor that resolves links against `domain`.
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        let domain: String = domain.into();
        Self {
            domain: domain.trim_end_matches('/').to_owned(),
        }
    }

    /// Returns one tagged result per listing block, in document order.
    #[must_use]
    pub fn extract_candidates(&self, html: &str) -> Vec<Result<Listing, ExtractError>> {
        let document = Html::parse_document(html);

        document
            .select(&SELECTORS.item)
            .enumerate()
            .map(|(index, item)| self.extract_one(index, item))
            .collect()
    }

    /// Returns the well-formed listings, logging and skipping malformed blocks.
    #[must_use]
    pub fn extract_listings(&self, html: &str) -> Vec<Listing> {
        let candidates = self.extract_candidates(html);
        let total = candidates.len();

        let listings: Vec<Listing> = candidates
            .into_iter()
            .filter_map(|candidate| match candidate {
                Ok(listing) => Some(listing),
                Err(e) => {
                    warn!("Skipping malformed listing: {}", e);
                    None
                }
            })
            .collect();

        debug!("Extracted {} of {} listing blocks", listings.len(), total);
        listings
    }

    fn extract_one(&self, index: usize, item: ElementRef<'_>) -> Result<Listing, ExtractError> {
        let missing = |field| ExtractError::MissingField { index, field };

        let title = first_text(item, &SELECTORS.title).ok_or_else(|| missing("title"))?;
        let price = first_text(item, &SELECTORS.price).ok_or_else(|| missing("price"))?;
        let href = item
            .select(&SELECTORS.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .ok_or_else(|| missing("link"))?;

        Ok(Listing {
            title,
            price,
            url: self.absolute_url(href),
        })
    }

    fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_owned()
        } else if href.starts_with('/') {
            format!("{}{href}", self.domain)
        } else {
            format!("{}/{href}", self.domain)
        }
    }
}

/// Extracts tagged listing results using `domain` as the link prefix.
#[must_use]
pub fn extract_candidates(html: &str, domain: &str) -> Vec<Result<Listing, ExtractError>> {
    ListingExtractor::new(domain).extract_candidates(html)
}

/// Extracts well-formed listings using `domain` as the link prefix.
#[must_use]
pub fn extract_listings(html: &str, domain: &str) -> Vec<Listing> {
    ListingExtractor::new(domain).extract_listings(html)
}

/// Text of the first element matching `selector`, whitespace-collapsed.
fn first_text(item: ElementRef<'_>, selector: &Selector) -> Option<String> {
    item.select(selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}
