//! Sitemap diffing
//!
//! Entry-level comparison of two sitemaps keyed by canonical URL. Used to
//! compare a fresh crawl against a previously published sitemap.

use crate::sitemap::{same_priority, SitemapEntry};
use std::collections::{HashMap, HashSet};

/// Difference between a previous and a current sitemap
#[derive(Debug, Default, PartialEq)]
pub struct SitemapDiff {
    /// Entries only the current sitemap has, in current order
    pub added: Vec<SitemapEntry>,
    /// Entries only the previous sitemap has, in previous order
    pub removed: Vec<SitemapEntry>,
    /// Entries in both whose priority or lastmod changed; carries the
    /// current version, in current order
    pub changed: Vec<SitemapEntry>,
}

impl SitemapDiff {
    /// True when both sitemaps carry the same entries with the same metadata
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Diffs two sitemaps
///
/// Priorities compare at the one-decimal precision the XML carries, so a
/// written-then-read sitemap diffs clean against the entries it was
/// written from.
pub fn diff_sitemaps(previous: &[SitemapEntry], current: &[SitemapEntry]) -> SitemapDiff {
    let previous_by_url: HashMap<&str, &SitemapEntry> = previous
        .iter()
        .map(|entry| (entry.url.as_str(), entry))
        .collect();
    let current_urls: HashSet<&str> =
        current.iter().map(|entry| entry.url.as_str()).collect();

    let mut diff = SitemapDiff::default();

    for entry in current {
        match previous_by_url.get(entry.url.as_str()) {
            None => diff.added.push(entry.clone()),
            Some(old) => {
                if !same_priority(old.priority, entry.priority) || old.lastmod != entry.lastmod {
                    diff.changed.push(entry.clone());
                }
            }
        }
    }

    for entry in previous {
        if !current_urls.contains(entry.url.as_str()) {
            diff.removed.push(entry.clone());
        }
    }

    diff
}
