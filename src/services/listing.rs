// src/services/listing.rs

//! Listing page parser.
//!
//! Gallery markup differs between variants and over time, so rows and title
//! anchors are located through ordered strategy lists: the first strategy
//! that yields a match wins.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{ListingSelectors, PostStub};
use crate::utils::collapse_whitespace;

/// One way of finding the title anchor inside a row.
#[derive(Debug, Clone)]
pub enum AnchorStrategy {
    /// First element matching a CSS selector (e.g. `a.ub-word`) that carries an href
    Selector(Selector),
    /// First anchor whose href looks like a detail link
    DetailLink(Regex),
}

impl AnchorStrategy {
    /// Try this strategy on a single row.
    pub fn find<'a>(&self, row: ElementRef<'a>) -> Option<ElementRef<'a>> {
        match self {
            AnchorStrategy::Selector(sel) => row.select(sel).find(has_href),
            AnchorStrategy::DetailLink(pattern) => {
                let anchors = any_anchor();
                row.select(anchors).find(|a| {
                    a.value()
                        .attr("href")
                        .is_some_and(|href| pattern.is_match(href))
                })
            }
        }
    }
}

fn has_href(anchor: &ElementRef<'_>) -> bool {
    anchor
        .value()
        .attr("href")
        .is_some_and(|href| !href.trim().is_empty())
}

fn any_anchor() -> &'static Selector {
    static ANCHOR: std::sync::OnceLock<Selector> = std::sync::OnceLock::new();
    ANCHOR.get_or_init(|| Selector::parse("a[href]").expect("static selector"))
}

/// Parses listing pages into post stubs.
#[derive(Debug, Clone)]
pub struct ListingParser {
    row_strategies: Vec<Selector>,
    anchor_strategies: Vec<AnchorStrategy>,
    date_selector: Selector,
    date_attr: String,
    excluded_title_markers: Vec<String>,
    blocked_patterns: Vec<Regex>,
}

impl ListingParser {
    /// Compile the configured selectors.
    pub fn new(selectors: &ListingSelectors) -> Result<Self> {
        let row_strategies = selectors
            .row_selectors
            .iter()
            .map(|s| parse_selector(s))
            .collect::<Result<Vec<_>>>()?;

        let detail_link = Regex::new(&selectors.detail_link_pattern)
            .map_err(|e| AppError::config(format!("detail_link_pattern: {e}")))?;
        let blocked_patterns = selectors
            .blocked_markers
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| AppError::config(format!("blocked_markers '{p}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            row_strategies,
            anchor_strategies: vec![
                AnchorStrategy::Selector(parse_selector(&selectors.title_selector)?),
                AnchorStrategy::DetailLink(detail_link),
            ],
            date_selector: parse_selector(&selectors.date_selector)?,
            date_attr: selectors.date_attr.clone(),
            excluded_title_markers: selectors.excluded_title_markers.clone(),
            blocked_patterns,
        })
    }

    /// Extract post stubs from a listing page.
    ///
    /// A page without content rows yields an empty vector.
    pub fn parse(&self, html: &str) -> Vec<PostStub> {
        let document = Html::parse_document(html);
        self.rows(&document)
            .into_iter()
            .filter_map(|row| self.parse_row(row))
            .collect()
    }

    /// Return the text of the first block-pattern match in the raw page, if any.
    pub fn detect_block(&self, html: &str) -> Option<String> {
        self.blocked_patterns
            .iter()
            .find_map(|pattern| pattern.find(html))
            .map(|m| m.as_str().to_string())
    }

    /// Candidate rows from the first row strategy that matches anything.
    fn rows<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        self.row_strategies
            .iter()
            .map(|sel| document.select(sel).collect::<Vec<_>>())
            .find(|rows| !rows.is_empty())
            .unwrap_or_default()
    }

    fn parse_row(&self, row: ElementRef<'_>) -> Option<PostStub> {
        let anchor = self
            .anchor_strategies
            .iter()
            .find_map(|strategy| strategy.find(row))?;

        let title = collapse_whitespace(&anchor.text().collect::<String>());
        if title.is_empty() || self.is_administrative(&title) {
            return None;
        }

        let detail_ref = anchor.value().attr("href")?.trim().to_string();

        Some(PostStub {
            title,
            detail_ref,
            raw_date: self.raw_date(row),
        })
    }

    fn is_administrative(&self, title: &str) -> bool {
        self.excluded_title_markers
            .iter()
            .any(|marker| title.contains(marker.as_str()))
    }

    /// Full-precision attribute first, visible text second.
    fn raw_date(&self, row: ElementRef<'_>) -> String {
        let Some(cell) = row.select(&self.date_selector).next() else {
            return String::new();
        };
        match cell.value().attr(&self.date_attr).map(str::trim) {
            Some(full) if !full.is_empty() => full.to_string(),
            _ => collapse_whitespace(&cell.text().collect::<String>()),
        }
    }
}

/// Parse a CSS selector, mapping failures into `AppError::Selector`.
pub(crate) fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ListingParser {
        ListingParser::new(&ListingSelectors::default()).unwrap()
    }

    const LISTING: &str = r#"
        <table><tbody>
          <tr class="ub-content">
            <td class="gall_tit"><a class="ub-word" href="/board/view/?id=stockus&no=100&page=1">
              <em class="icon_img"></em>공지 갤러리 이용 안내</a></td>
            <td class="gall_date" title="2024-05-01 09:00:00">05.01</td>
          </tr>
          <tr class="ub-content">
            <td class="gall_tit"><a class="ub-word" href="/board/view/?id=stockus&no=101&page=1">테슬라 간다</a></td>
            <td class="gall_date" title="2024-05-30 14:02:11">14:02</td>
          </tr>
          <tr class="ub-content">
            <td class="gall_tit"><a class="ub-word" href="/board/view/?id=stockus&no=102&page=1">엔비디아   실적</a></td>
            <td class="gall_date">24.05.29</td>
          </tr>
          <tr class="ub-content">
            <td class="gall_tit"><a href="/board/view/?id=stockus&no=103">설문 참여하세요</a></td>
          </tr>
        </tbody></table>
    "#;

    #[test]
    fn test_parse_skips_administrative_rows() {
        let stubs = parser().parse(LISTING);
        assert_eq!(stubs.len(), 2);
        assert_eq!(stubs[0].title, "테슬라 간다");
        assert_eq!(stubs[0].detail_ref, "/board/view/?id=stockus&no=101&page=1");
        assert_eq!(stubs[1].title, "엔비디아 실적");
    }

    #[test]
    fn test_date_prefers_title_attribute() {
        let stubs = parser().parse(LISTING);
        assert_eq!(stubs[0].raw_date, "2024-05-30 14:02:11");
        assert_eq!(stubs[1].raw_date, "24.05.29");
    }

    #[test]
    fn test_anchor_scan_when_title_class_missing() {
        let html = r#"
            <div><table>
              <tr><th>제목</th><th>날짜</th></tr>
              <tr>
                <td><a href="/mini/board/lists/?id=x">목록</a>
                    <a href="/mini/board/view/?id=x&no=55">미니갤 첫글</a></td>
                <td class="gall_date">12:30</td>
              </tr>
            </table></div>
        "#;
        let stubs = parser().parse(html);
        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].title, "미니갤 첫글");
        assert_eq!(stubs[0].post_id(), "55");
        assert_eq!(stubs[0].raw_date, "12:30");
    }

    #[test]
    fn test_row_fallback_when_primary_selector_misses() {
        let html = r#"
            <table><thead>
              <tr><td><a class="ub-word" href="/board/view/?id=x&no=8">헤더 행 글</a></td>
                  <td class="gall_date" title="2024.05.01">05.01</td></tr>
            </thead></table>
        "#;
        let stubs = parser().parse(html);
        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].raw_date, "2024.05.01");
    }

    #[test]
    fn test_rows_without_anchor_are_skipped() {
        let html = "<table><tbody><tr><td>빈 줄</td></tr></tbody></table>";
        assert!(parser().parse(html).is_empty());
    }

    #[test]
    fn test_empty_page_is_not_an_error() {
        assert!(parser().parse("<html><body></body></html>").is_empty());
    }

    #[test]
    fn test_missing_date_cell_yields_empty_raw_date() {
        let html = r#"<table><tbody><tr><td><a class="ub-word" href="/board/view/?no=9">제목</a></td></tr></tbody></table>"#;
        let stubs = parser().parse(html);
        assert_eq!(stubs[0].raw_date, "");
    }

    #[test]
    fn test_anchor_strategies_individually() {
        let html = Html::parse_fragment(
            r#"<table><tr><td><a href="/x">x</a><a href="/board/view/?id=a&no=3">t</a></td></tr></table>"#,
        );
        let row_sel = Selector::parse("tr").unwrap();
        let row = html.select(&row_sel).next().unwrap();

        let by_class = AnchorStrategy::Selector(Selector::parse("a.ub-word").unwrap());
        assert!(by_class.find(row).is_none());

        let by_link = AnchorStrategy::DetailLink(Regex::new(r"board/view.*[?&]no=\d+").unwrap());
        let anchor = by_link.find(row).unwrap();
        assert_eq!(anchor.value().attr("href"), Some("/board/view/?id=a&no=3"));
    }

    #[test]
    fn test_href_less_title_falls_back_to_detail_link() {
        let html = r#"
            <table><tbody>
              <tr><td><a class="ub-word">테슬라 간다</a>
                      <a href="/board/view/?id=stockus&no=201">테슬라 간다</a></td></tr>
              <tr><td><a class="ub-word">엔비디아 실적</a>
                      <a href="/board/view/?id=stockus&no=202">엔비디아 실적</a></td></tr>
              <tr><td><a class="ub-word" href="">빈 링크</a></td></tr>
            </tbody></table>
        "#;
        let stubs = parser().parse(html);
        let ids: Vec<String> = stubs.iter().map(PostStub::post_id).collect();
        assert_eq!(ids, vec!["201", "202"]);
    }

    #[test]
    fn test_detect_block() {
        let p = parser();
        let blocked = r#"<script>location.replace("https://example.com/blocked");</script>"#;
        let marker = p.detect_block(blocked).unwrap();
        assert!(marker.starts_with("location.replace(\"https://example.com/block"));

        let dashed = r#"<script>window.location.href = '/error/block?id=stockus';</script>"#;
        assert!(p.detect_block(dashed).is_some());
        assert!(p.detect_block(LISTING).is_none());
    }

    #[test]
    fn test_ordinary_redirect_handlers_are_not_blocks() {
        let html = r#"
            <button onclick="window.location.href='/board/write/?id=stockus'">글쓰기</button>
            <script>location.replace("/board/lists/?id=stockus&page=2");</script>
        "#;
        assert!(parser().detect_block(html).is_none());
    }

    #[test]
    fn test_invalid_block_pattern_is_config_error() {
        let selectors = ListingSelectors {
            blocked_markers: vec!["(unclosed".to_string()],
            ..ListingSelectors::default()
        };
        assert!(matches!(
            ListingParser::new(&selectors),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_parse_selector_invalid() {
        assert!(parse_selector("div.class").is_ok());
        assert!(parse_selector("[[invalid").is_err());
    }
}
