// src/models/selectors.rs

//! CSS selectors and markers for scraping gallery pages.

use serde::{Deserialize, Serialize};

/// Extraction rules for listing and detail pages.
///
/// Selector lists are ordered: the first one that matches wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Candidate row selectors, primary first
    #[serde(default = "defaults::row_selectors")]
    pub row_selectors: Vec<String>,

    /// Selector for the title anchor within a row
    #[serde(default = "defaults::title_selector")]
    pub title_selector: String,

    /// Regex a row anchor's href must match to count as a detail link
    #[serde(default = "defaults::detail_link_pattern")]
    pub detail_link_pattern: String,

    /// Selector for the date cell within a row
    #[serde(default = "defaults::date_selector")]
    pub date_selector: String,

    /// Attribute holding the full-precision date
    #[serde(default = "defaults::date_attr")]
    pub date_attr: String,

    /// Title substrings marking administrative rows
    #[serde(default = "defaults::excluded_title_markers")]
    pub excluded_title_markers: Vec<String>,

    /// Selector for the post body on the detail page
    #[serde(default = "defaults::body_selector")]
    pub body_selector: String,

    /// Regex patterns for the redirect the source emits when it blocks the client
    #[serde(default = "defaults::blocked_markers")]
    pub blocked_markers: Vec<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            row_selectors: defaults::row_selectors(),
            title_selector: defaults::title_selector(),
            detail_link_pattern: defaults::detail_link_pattern(),
            date_selector: defaults::date_selector(),
            date_attr: defaults::date_attr(),
            excluded_title_markers: defaults::excluded_title_markers(),
            body_selector: defaults::body_selector(),
            blocked_markers: defaults::blocked_markers(),
        }
    }
}

mod defaults {
    pub fn row_selectors() -> Vec<String> {
        vec!["tbody tr".into(), "tr".into()]
    }
    pub fn title_selector() -> String {
        "a.ub-word".into()
    }
    pub fn detail_link_pattern() -> String {
        r"board/view.*[?&]no=\d+".into()
    }
    pub fn date_selector() -> String {
        "td.gall_date".into()
    }
    pub fn date_attr() -> String {
        "title".into()
    }
    pub fn excluded_title_markers() -> Vec<String> {
        vec!["공지".into(), "설문".into()]
    }
    pub fn body_selector() -> String {
        "div.write_div".into()
    }
    pub fn blocked_markers() -> Vec<String> {
        vec![r#"location\.(?:replace\(|href\s*=)\s*["'][^"']*/(?:error/)?block"#.into()]
    }
}
