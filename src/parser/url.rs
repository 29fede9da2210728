//! Page IDs from Confluence URLs.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

fn page_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/pages/(\d+)").expect("valid page path regex"))
}

fn page_query_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?&]pageId=(\d+)").expect("valid page query regex"))
}

/// Extract a page ID from a Confluence link, if it points at a page.
///
/// Recognizes `.../pages/<id>/...` paths and `viewpage.action?pageId=<id>` queries.
pub fn page_id_from_href(href: &str) -> Option<String> {
    page_path_regex()
        .captures(href)
        .or_else(|| page_query_regex().captures(href))
        .map(|c| c[1].to_string())
}

/// Accept either a numeric page ID or a page URL.
pub fn parse_page_ref(input: &str) -> Result<String> {
    let input = input.trim();
    if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
        return Ok(input.to_string());
    }
    page_id_from_href(input).ok_or_else(|| Error::InvalidUrl(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_from_path() {
        assert_eq!(
            page_id_from_href("https://x.atlassian.net/wiki/spaces/DOC/pages/123456/Title"),
            Some("123456".to_string())
        );
    }

    #[test]
    fn test_page_id_from_query() {
        assert_eq!(
            page_id_from_href("https://wiki.local/pages/viewpage.action?spaceKey=A&pageId=42"),
            Some("42".to_string())
        );
        assert_eq!(page_id_from_href("https://example.com/about"), None);
    }

    #[test]
    fn test_parse_page_ref() {
        assert_eq!(parse_page_ref(" 987 ").unwrap(), "987");
        assert_eq!(
            parse_page_ref("https://x.atlassian.net/wiki/spaces/A/pages/5").unwrap(),
            "5"
        );
        assert!(matches!(parse_page_ref("not a page"), Err(Error::InvalidUrl(_))));
    }
}
