//! Utility functions and helpers.

pub mod http;
pub mod log;
pub mod text;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> Option<String> {
    Url::parse(base_url)
        .ok()
        .map(|base| resolve_url(&base, href))
}

/// Parse a CSS selector.
pub fn selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Text of the first element matching `css`, whitespace collapsed.
pub fn select_text(document: &Html, css: &str) -> Result<Option<String>> {
    let sel = selector(css)?;
    Ok(document
        .select(&sel)
        .next()
        .map(|el| text::collapse_whitespace(&element_text(&el))))
}

/// All text beneath an element, concatenated.
pub fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("http://www.coolrunning.com/results/15/ma/Mar8_Boston_set1.shtml").unwrap();
        assert_eq!(
            resolve_url(&base, "./Mar8_Boston_set2.shtml"),
            "http://www.coolrunning.com/results/15/ma/Mar8_Boston_set2.shtml"
        );
        assert_eq!(
            resolve_url(&base, "/results/15/ma.shtml"),
            "http://www.coolrunning.com/results/15/ma.shtml"
        );
        assert_eq!(resolve_url(&base, "https://other.com/x"), "https://other.com/x");
    }

    #[test]
    fn test_resolve_invalid_base() {
        assert_eq!(resolve("not a url", "x.html"), None);
    }

    #[test]
    fn test_select_text() {
        let doc = Html::parse_document("<h1>  Purple\n  Stride 5K </h1>");
        assert_eq!(select_text(&doc, "h1").unwrap(), Some("Purple Stride 5K".to_string()));
        assert_eq!(select_text(&doc, "h2").unwrap(), None);
        assert!(select_text(&doc, "[[bad").is_err());
    }
}
