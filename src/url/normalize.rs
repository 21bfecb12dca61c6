use crate::UrlError;
use url::Url;

/// Normalizes a raw URL string into its canonical form
///
/// Every URL entering the frontier, the store, or a sitemap passes through
/// here, so the canonical form is the identity used for deduplication.
///
/// # Normalization Steps
///
/// 1. Resolve relative references against `base` when one is given
/// 2. Reject anything that is not http or https (javascript:, mailto:,
///    tel:, data: and friends all fail the scheme check)
/// 3. Reject URLs without a host
/// 4. Strip the fragment
///
/// Lowercasing of scheme and host, removal of default ports (`:80`/`:443`),
/// and dot-segment collapse are guaranteed by `Url` parsing itself. Query
/// strings and non-root trailing slashes are preserved: `/a` and `/a/` are
/// distinct pages.
///
/// # Arguments
///
/// * `raw` - The URL string, absolute or (with `base`) relative
/// * `base` - Base URL for resolving relative references
///
/// # Returns
///
/// * `Ok(Url)` - The canonical URL
/// * `Err(UrlError)` - Malformed input or out-of-scope scheme
///
/// # Examples
///
/// ```
/// use sitemapper::url::normalize;
///
/// let url = normalize("HTTP://Example.COM:80/a/../b#frag", None).unwrap();
/// assert_eq!(url.as_str(), "http://example.com/b");
/// ```
pub fn normalize(raw: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Malformed {
            url: raw.to_string(),
            reason: "empty URL".to_string(),
        });
    }

    let mut url = match base {
        Some(base) => base.join(trimmed),
        None => Url::parse(trimmed),
    }
    .map_err(|e| UrlError::Malformed {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::UnsupportedScheme(trimmed.to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost(trimmed.to_string()));
    }

    url.set_fragment(None);

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_scheme_and_host() {
        let result = normalize("HTTPS://EXAMPLE.COM/Page", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_strip_default_ports() {
        let result = normalize("http://example.com:80/a", None).unwrap();
        assert_eq!(result.as_str(), "http://example.com/a");

        let result = normalize("https://example.com:443/a", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/a");
    }

    #[test]
    fn test_keep_explicit_ports() {
        let result = normalize("https://example.com:8443/a", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com:8443/a");
    }

    #[test]
    fn test_strip_fragment() {
        let result = normalize("https://example.com/page#section", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_collapse_dot_segments() {
        let result = normalize("https://example.com/a/../b/./c", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/b/c");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize("https://example.com", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_trailing_slash_preserved() {
        let result = normalize("https://example.com/page/", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page/");
    }

    #[test]
    fn test_query_preserved() {
        let result = normalize("https://example.com/search?q=rust&page=2", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/search?q=rust&page=2");
    }

    #[test]
    fn test_relative_resolution() {
        let base = Url::parse("https://example.com/docs/intro").unwrap();
        let result = normalize("../api/index.html", Some(&base)).unwrap();
        assert_eq!(result.as_str(), "https://example.com/api/index.html");
    }

    #[test]
    fn test_root_relative_resolution() {
        let base = Url::parse("https://example.com/docs/intro").unwrap();
        let result = normalize("/pricing", Some(&base)).unwrap();
        assert_eq!(result.as_str(), "https://example.com/pricing");
    }

    #[test]
    fn test_rejects_non_http_schemes() {
        for raw in [
            "ftp://example.com/file",
            "javascript:void(0)",
            "mailto:user@example.com",
            "tel:+1234567890",
            "data:text/html,hello",
        ] {
            let result = normalize(raw, None);
            assert!(result.is_err(), "expected rejection of '{}'", raw);
        }
    }

    #[test]
    fn test_rejects_relative_without_base() {
        assert!(normalize("/page", None).is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(normalize("", None).is_err());
        assert!(normalize("   ", None).is_err());
    }

    #[test]
    fn test_idempotent() {
        let urls = [
            "HTTP://Example.COM:80/a/../b?x=1#frag",
            "https://example.com",
            "https://example.com/page/",
            "https://example.com:8080/x?b=2&a=1",
        ];
        for raw in urls {
            let once = normalize(raw, None).unwrap();
            let twice = normalize(once.as_str(), None).unwrap();
            assert_eq!(once, twice, "normalization not idempotent for '{}'", raw);
        }
    }
}
