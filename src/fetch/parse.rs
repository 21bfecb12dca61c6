//! HTML parsing for link and form extraction
//!
//! Shared by the light backend (which parses the fetched body directly);
//! the rendered backend extracts from the live DOM instead so that
//! script-inserted anchors are seen.

use scraper::{Html, Selector};
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Absolute http(s) links found in <a href> elements
    pub links: Vec<Url>,

    /// Whether the page contains at least one <form> element
    pub has_form: bool,
}

/// Parses HTML content and extracts outgoing links and form presence
///
/// # Link Extraction Rules
///
/// **Include:** `<a href="...">` anchors, relative hrefs resolved against
/// `base_url`.
///
/// **Exclude:** `javascript:`, `mailto:`, `tel:`, `data:` links, pure
/// fragments, download anchors, and anything that is not http(s) after
/// resolution.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    let mut links = Vec::new();
    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                if let Some(url) = resolve_link(href, base_url) {
                    links.push(url);
                }
            }
        }
    }

    let has_form = match Selector::parse("form") {
        Ok(selector) => document.select(&selector).next().is_some(),
        Err(_) => false,
    };

    ParsedPage { links, has_form }
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None for hrefs that can never lead to a page: empty strings,
/// pure fragments, non-web schemes, and anything that fails to resolve.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    for scheme in ["javascript:", "mailto:", "tel:", "data:"] {
        if lower.starts_with(scheme) {
            return None;
        }
    }

    let url = base_url.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/docs/").unwrap()
    }

    #[test]
    fn test_extracts_absolute_and_relative_links() {
        let html = r#"
            <html><body>
                <a href="https://example.com/a">A</a>
                <a href="/b">B</a>
                <a href="c.html">C</a>
            </body></html>
        "#;
        let parsed = parse_html(html, &base());
        let links: Vec<&str> = parsed.links.iter().map(|u| u.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://example.com/a",
                "https://example.com/b",
                "https://example.com/docs/c.html",
            ]
        );
    }

    #[test]
    fn test_skips_non_web_schemes() {
        let html = r##"
            <html><body>
                <a href="javascript:void(0)">js</a>
                <a href="mailto:x@example.com">mail</a>
                <a href="tel:+123">tel</a>
                <a href="data:text/plain,x">data</a>
                <a href="#section">frag</a>
                <a href="">empty</a>
                <a href="/real">real</a>
            </body></html>
        "##;
        let parsed = parse_html(html, &base());
        assert_eq!(parsed.links.len(), 1);
        assert_eq!(parsed.links[0].as_str(), "https://example.com/real");
    }

    #[test]
    fn test_skips_download_anchors() {
        let html = r#"<a href="/file" download>get</a><a href="/page">p</a>"#;
        let parsed = parse_html(html, &base());
        assert_eq!(parsed.links.len(), 1);
        assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
    }

    #[test]
    fn test_detects_forms() {
        let with_form = r#"<html><body><form action="/search"></form></body></html>"#;
        assert!(parse_html(with_form, &base()).has_form);

        let without_form = r#"<html><body><div>no form here</div></body></html>"#;
        assert!(!parse_html(without_form, &base()).has_form);
    }

    #[test]
    fn test_empty_document() {
        let parsed = parse_html("", &base());
        assert!(parsed.links.is_empty());
        assert!(!parsed.has_form);
    }
}
