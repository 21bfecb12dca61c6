//! Fetch backend module
//!
//! Defines the [`FetchBackend`] trait the crawl controller drives, the
//! uniform [`FetchResult`] both backends produce, and the [`FetchError`]
//! taxonomy. The light backend speaks plain HTTP; the rendered backend
//! drives a headless Chrome and sees script-inserted content.

mod light;
mod parse;
mod rendered;

pub use light::LightFetcher;
pub use parse::{parse_html, ParsedPage};
pub use rendered::RenderedFetcher;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Redirect hops a single fetch will follow before giving up
pub const REDIRECT_CAP: usize = 10;

/// Outcome of a successful fetch
///
/// `status` is the first status the server answered with: for a redirected
/// fetch that is the original 3xx, while `final_url` points at the end of
/// the chain. Both backends fill the same shape so the controller never
/// branches on the backend in use.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// First HTTP status answered (the 3xx for redirected fetches)
    pub status: u16,
    /// URL after following redirects; equals the request URL otherwise
    pub final_url: Url,
    /// Whether any redirect was followed
    pub redirected: bool,
    /// Content-Type of the terminal response
    pub content_type: String,
    /// Raw Last-Modified header of the terminal response
    pub last_modified: Option<String>,
    /// Absolute http(s) links extracted from the document
    pub links: Vec<Url>,
    /// Whether the document contains at least one form
    pub has_form: bool,
}

/// Fetch failure taxonomy
#[derive(Error, Debug)]
pub enum FetchError {
    /// The fetch exceeded the configured per-fetch timeout
    #[error("Request timed out")]
    Timeout,

    /// Connection-level failure (DNS, refused, TLS, reset)
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The redirect chain exceeded the hop cap
    #[error("Too many redirects (more than {REDIRECT_CAP})")]
    TooManyRedirects,

    /// Successful response carrying a non-HTML body
    #[error("Non-HTML response ({status}): {content_type}")]
    NonHtml { status: u16, content_type: String },

    /// Browser-side failure in the rendered backend
    #[error("Browser error: {0}")]
    Browser(String),
}

impl FetchError {
    /// Whether retrying the same fetch could plausibly succeed
    ///
    /// Only connection-level failures are considered transient. Timeouts
    /// are terminal because a retry would block a worker for another full
    /// timeout window on a URL that already proved slow.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::ConnectionFailed(_))
    }
}

/// A page-fetching strategy
///
/// Implementations are shared across all workers, so they must be cheap to
/// call concurrently. The per-fetch timeout, user agent, and cookies are
/// fixed at construction from the crawl configuration.
#[async_trait]
pub trait FetchBackend: Send + Sync {
    /// Fetches one URL and extracts its outgoing links
    async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError>;

    /// Releases backend resources once the crawl has ended
    async fn shutdown(&self) {}
}

/// Returns true when a Content-Type names an HTML document
///
/// Servers that omit the header entirely are treated as HTML; sites that
/// misconfigure it this way overwhelmingly serve pages.
pub fn is_html_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    essence.is_empty() || essence == "text/html" || essence == "application/xhtml+xml"
}
