//! Crawl frontier
//!
//! FIFO queue of pending fetches with an integrated visited set. A URL
//! enters the frontier at most once per crawl; the depth recorded for it is
//! the depth of its first discovery, regardless of how many later pages
//! link to it.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use url::Url;

/// A unit of pending work
#[derive(Debug, Clone)]
pub struct FrontierItem {
    /// Canonical URL to fetch
    pub url: Url,
    /// Link depth from the seed (seed is 0)
    pub depth: u32,
    /// The page this URL was discovered on, None for the seed
    pub discovered_from: Option<Url>,
}

#[derive(Default)]
struct FrontierInner {
    queue: VecDeque<FrontierItem>,
    /// Canonical URL string to depth of first discovery
    visited: HashMap<String, u32>,
}

/// Deduplicating FIFO work queue shared by all workers
///
/// FIFO ordering makes the crawl breadth-first: all of depth N drains
/// before depth N+1, which is what keeps recorded depths minimal.
#[derive(Default)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues an item unless its URL was already seen
    ///
    /// Returns true when the item was actually enqueued.
    pub fn push(&self, item: FrontierItem) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let key = item.url.as_str().to_string();
        if inner.visited.contains_key(&key) {
            return false;
        }
        inner.visited.insert(key, item.depth);
        inner.queue.push_back(item);
        true
    }

    /// Marks a URL as seen without enqueuing it
    ///
    /// Used for URLs that get an outcome recorded at discovery time (depth
    /// limit) so later sightings stay no-ops. Returns true when the URL was
    /// newly marked.
    pub fn mark_visited(&self, url: &Url, depth: u32) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let key = url.as_str().to_string();
        if inner.visited.contains_key(&key) {
            return false;
        }
        inner.visited.insert(key, depth);
        true
    }

    /// Pops the oldest pending item
    pub fn pop(&self) -> Option<FrontierItem> {
        self.pop_batch(1).pop()
    }

    /// Pops up to `n` of the oldest pending items
    pub fn pop_batch(&self, n: usize) -> Vec<FrontierItem> {
        let mut inner = self.inner.lock().unwrap();
        let take = n.min(inner.queue.len());
        inner.queue.drain(..take).collect()
    }

    /// Whether any work is pending
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().queue.is_empty()
    }

    /// Number of pending items
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    /// Whether a URL has ever been seen this crawl
    pub fn is_visited(&self, url: &Url) -> bool {
        self.inner.lock().unwrap().visited.contains_key(url.as_str())
    }
}
