//! URL handling module
//!
//! Canonical URL normalization plus the scope filters that decide whether a
//! discovered link belongs in the crawl at all: same-host checks, seed-scheme
//! alignment, and a static-asset extension filter.

mod normalize;

pub use normalize::normalize;

use url::Url;

/// File extensions that never yield crawlable HTML pages
const SKIP_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".css", ".js", ".mjs",
    ".zip", ".tar", ".gz", ".rar", ".7z", ".mp3", ".mp4", ".avi", ".mov", ".wmv", ".doc",
    ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".woff", ".woff2", ".ttf", ".eot", ".xml",
    ".json", ".rss", ".atom",
];

/// The origin of a URL (`scheme://host[:port]`), the robots cache key
pub fn origin_of(url: &Url) -> String {
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), url.host_str().unwrap_or(""), port),
        None => format!("{}://{}", url.scheme(), url.host_str().unwrap_or("")),
    }
}

/// Returns true when both URLs point at the same host
pub fn is_same_host(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

/// Rewrites `url` to the seed's scheme when they differ
///
/// Sites that link to themselves over the other scheme would otherwise
/// produce two frontier entries for the same page.
pub fn align_scheme(mut url: Url, seed: &Url) -> Url {
    if url.scheme() != seed.scheme() {
        // set_scheme only fails for cross-category changes; http <-> https is fine
        let _ = url.set_scheme(seed.scheme());
    }
    url
}

/// Returns true when the URL path does not end in a known non-page extension
pub fn is_crawlable_path(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    !SKIP_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_of() {
        let url = Url::parse("https://example.com/a/b?q=1").unwrap();
        assert_eq!(origin_of(&url), "https://example.com");

        let url = Url::parse("http://example.com:8080/a").unwrap();
        assert_eq!(origin_of(&url), "http://example.com:8080");
    }

    #[test]
    fn test_is_same_host() {
        let a = Url::parse("https://example.com/a").unwrap();
        let b = Url::parse("https://example.com/b?x=2").unwrap();
        let c = Url::parse("https://other.com/a").unwrap();
        let d = Url::parse("https://sub.example.com/a").unwrap();

        assert!(is_same_host(&a, &b));
        assert!(!is_same_host(&a, &c));
        assert!(!is_same_host(&a, &d));
    }

    #[test]
    fn test_align_scheme() {
        let seed = Url::parse("https://example.com/").unwrap();
        let url = Url::parse("http://example.com/page").unwrap();
        assert_eq!(
            align_scheme(url, &seed).as_str(),
            "https://example.com/page"
        );

        let url = Url::parse("https://example.com/page").unwrap();
        assert_eq!(
            align_scheme(url, &seed).as_str(),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_is_crawlable_path() {
        let page = Url::parse("https://example.com/docs/page").unwrap();
        assert!(is_crawlable_path(&page));

        let pdf = Url::parse("https://example.com/manual.PDF").unwrap();
        assert!(!is_crawlable_path(&pdf));

        let image = Url::parse("https://example.com/logo.png?v=2").unwrap();
        assert!(!is_crawlable_path(&image));

        let html = Url::parse("https://example.com/index.html").unwrap();
        assert!(is_crawlable_path(&html));
    }
}
