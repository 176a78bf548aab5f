//! Detail page parser.

use scraper::{Html, Selector};

use crate::error::Result;
use crate::models::ListingSelectors;
use crate::services::listing::parse_selector;
use crate::utils::collapse_whitespace;

/// Extracts the plain-text body of a post.
#[derive(Debug, Clone)]
pub struct DetailParser {
    body_selector: Selector,
}

impl DetailParser {
    pub fn new(selectors: &ListingSelectors) -> Result<Self> {
        Ok(Self {
            body_selector: parse_selector(&selectors.body_selector)?,
        })
    }

    /// Whitespace-collapsed text of the content container, or `""` when absent.
    pub fn parse(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        document
            .select(&self.body_selector)
            .next()
            .map(|body| collapse_whitespace(&body.text().collect::<Vec<_>>().join(" ")))
            .unwrap_or_default()
    }
}
