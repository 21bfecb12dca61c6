//! Progress events
//!
//! Events emitted by the controller while a crawl runs, consumed by the
//! CLI for live reporting. The channel is fire-and-forget: a lagging or
//! dropped consumer never slows the crawl down.

use crate::store::{CrawlStats, PageStatus};
use url::Url;

/// How a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The frontier drained with no fetches in flight
    Completed,
    /// Cancellation was requested and all in-flight fetches settled
    Cancelled,
    /// The crawl could not run (backend launch failure)
    Failed,
}

/// One progress notification
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// An outcome was recorded
    Page {
        url: Url,
        depth: u32,
        status: PageStatus,
        http_status: Option<u16>,
        error: Option<String>,
    },
    /// Periodic aggregate counters
    Stats(CrawlStats),
    /// The crawl ended; no further events follow
    Finished(Termination),
}
