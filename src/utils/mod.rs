//! Utility functions and helpers.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Extract the numeric post number from a detail link.
///
/// Looks for a `no=` query parameter first, then a trailing numeric path segment.
pub fn extract_post_no(link: &str) -> Option<String> {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            Regex::new(r"[?&]no=(\d+)").expect("static regex"),
            Regex::new(r"/(\d+)/?(?:[?#].*)?$").expect("static regex"),
        ]
    });

    patterns
        .iter()
        .find_map(|p| p.captures(link))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://gall.dcinside.com/mgallery/board/lists/").unwrap();
        assert_eq!(
            resolve_url(&base, "/mgallery/board/view/?id=x&no=1"),
            "https://gall.dcinside.com/mgallery/board/view/?id=x&no=1"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_extract_post_no() {
        assert_eq!(
            extract_post_no("/board/view/?id=stockus&no=123&page=2"),
            Some("123".to_string())
        );
        assert_eq!(
            extract_post_no("https://m.example.com/board/stockus/456"),
            Some("456".to_string())
        );
        assert_eq!(extract_post_no("/board/view/?id=stockus"), None);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  c "), "a b c");
    }
}
