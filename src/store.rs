//! Crawl result store
//!
//! Append-only collection of crawl outcomes in discovery-completion order,
//! plus the aggregate counters reported during and after a crawl. The store
//! holds at most one outcome per canonical URL; the first recorded wins.

use chrono::{DateTime, FixedOffset, Utc};
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use url::Url;

/// Classification of a crawled (or skipped) URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// Terminal 2xx HTML response
    Ok,
    /// Redirect chain ending on the same host
    Redirect,
    /// Redirect chain ending on another host
    RedirectExternal,
    /// Successful response with a non-HTML body
    NonHtml,
    /// HTTP error status or fetch failure
    Error,
    /// Skipped because robots.txt disallows the path
    RobotsDisallowed,
    /// Discovered beyond max depth, never fetched
    DepthExceeded,
}

impl PageStatus {
    /// Whether this outcome was skipped without a fetch
    pub fn is_skip(&self) -> bool {
        matches!(self, PageStatus::RobotsDisallowed | PageStatus::DepthExceeded)
    }
}

/// One recorded outcome for one canonical URL
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Canonical URL
    pub url: Url,
    /// Link depth at first discovery
    pub depth: u32,
    /// Outcome classification
    pub status: PageStatus,
    /// HTTP status answered, when a fetch happened (the 3xx for redirects)
    pub http_status: Option<u16>,
    /// URL after redirects, when it differs from `url`
    pub final_url: Option<Url>,
    /// Content-Type of the response
    pub content_type: Option<String>,
    /// Parsed Last-Modified header
    pub last_modified: Option<DateTime<FixedOffset>>,
    /// Whether the page contains a form
    pub has_form: bool,
    /// Error description for Error outcomes
    pub error: Option<String>,
    /// When the outcome was recorded
    pub recorded_at: DateTime<Utc>,
}

impl CrawlOutcome {
    /// An outcome for a URL that was skipped without fetching
    pub fn skipped(url: Url, depth: u32, status: PageStatus) -> Self {
        CrawlOutcome {
            url,
            depth,
            status,
            http_status: None,
            final_url: None,
            content_type: None,
            last_modified: None,
            has_form: false,
            error: None,
            recorded_at: Utc::now(),
        }
    }
}

/// Parses an HTTP Last-Modified header value
///
/// Header dates are RFC 2822. Anything unparseable is dropped rather than
/// guessed at; a sitemap with no lastmod beats one with a wrong lastmod.
pub fn parse_last_modified(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(value).ok()
}

/// Aggregate crawl counters
#[derive(Debug, Clone, Default)]
pub struct CrawlStats {
    /// Outcomes recorded so far
    pub recorded: usize,
    /// URLs still queued
    pub queued: usize,
    /// Error outcomes
    pub errors: usize,
    /// Skipped outcomes (robots, depth)
    pub skipped: usize,
    /// 2xx responses
    pub status_2xx: usize,
    /// 3xx responses
    pub status_3xx: usize,
    /// 4xx responses
    pub status_4xx: usize,
    /// 5xx responses
    pub status_5xx: usize,
    /// Time since the crawl started
    pub elapsed: Duration,
}

impl CrawlStats {
    /// Fetched URLs per second over the whole crawl
    pub fn urls_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.recorded - self.skipped) as f64 / secs
        } else {
            0.0
        }
    }
}

struct StoreInner {
    outcomes: Vec<CrawlOutcome>,
    seen: HashSet<String>,
}

/// Append-only store of crawl outcomes
///
/// Shared by every worker; ordering is completion order, which the sitemap
/// writer preserves.
pub struct CrawlResultStore {
    inner: Mutex<StoreInner>,
    started_at: Instant,
}

impl Default for CrawlResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlResultStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                outcomes: Vec::new(),
                seen: HashSet::new(),
            }),
            started_at: Instant::now(),
        }
    }

    /// Records an outcome unless one already exists for the URL
    ///
    /// Returns true when the outcome was stored.
    pub fn record(&self, outcome: CrawlOutcome) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let key = outcome.url.as_str().to_string();
        if !inner.seen.insert(key) {
            return false;
        }
        inner.outcomes.push(outcome);
        true
    }

    /// Number of recorded outcomes
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies out all outcomes in recording order
    ///
    /// The snapshot is consistent: outcomes recorded after it started do
    /// not appear, partially recorded outcomes cannot exist.
    pub fn snapshot(&self) -> Vec<CrawlOutcome> {
        self.inner.lock().unwrap().outcomes.clone()
    }

    /// Current aggregate counters; `queued` is supplied by the caller
    pub fn stats(&self, queued: usize) -> CrawlStats {
        let inner = self.inner.lock().unwrap();
        let mut stats = CrawlStats {
            recorded: inner.outcomes.len(),
            queued,
            elapsed: self.started_at.elapsed(),
            ..CrawlStats::default()
        };
        for outcome in &inner.outcomes {
            if outcome.status == PageStatus::Error {
                stats.errors += 1;
            }
            if outcome.status.is_skip() {
                stats.skipped += 1;
            }
            match outcome.http_status {
                Some(code) if (200..300).contains(&code) => stats.status_2xx += 1,
                Some(code) if (300..400).contains(&code) => stats.status_3xx += 1,
                Some(code) if (400..500).contains(&code) => stats.status_4xx += 1,
                Some(code) if (500..600).contains(&code) => stats.status_5xx += 1,
                _ => {}
            }
        }
        stats
    }
}
