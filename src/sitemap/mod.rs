//! Sitemap module
//!
//! The [`SitemapEntry`] model shared by writer, reader, and differ, the
//! depth-to-priority mapping, and the filter that turns crawl outcomes into
//! sitemap entries.

mod diff;
mod reader;
mod writer;

pub use diff::{diff_sitemaps, SitemapDiff};
pub use reader::read_sitemap;
pub use writer::write_sitemap;

use crate::fetch::is_html_content_type;
use crate::store::{CrawlOutcome, PageStatus};
use chrono::NaiveDate;
use url::Url;

/// Maximum URLs one sitemap file may carry per the sitemaps.org protocol
pub const MAX_URLS_PER_SITEMAP: usize = 50_000;

/// The sitemaps.org namespace
pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// One `<url>` element of a sitemap
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    /// Canonical page URL
    pub url: Url,
    /// Crawl priority in [0.1, 1.0], one decimal of precision
    pub priority: f32,
    /// Last modification date, when the server reported one
    pub lastmod: Option<NaiveDate>,
}

/// Maps link depth to sitemap priority
///
/// The seed gets 1.0 and every level of depth costs 0.1, floored at 0.1
/// so deep pages keep a nonzero priority.
pub fn priority_for_depth(depth: u32) -> f32 {
    (1.0 - depth as f32 * 0.1).max(0.1)
}

/// Compares two priorities at the one-decimal precision the XML carries
pub fn same_priority(a: f32, b: f32) -> bool {
    (a * 10.0).round() as i32 == (b * 10.0).round() as i32
}

/// Filters crawl outcomes down to sitemap entries
///
/// Only terminal 2xx HTML pages are eligible: redirects, errors, non-HTML
/// responses, and skipped URLs never appear in the sitemap. Outcome order
/// is preserved.
pub fn entries_from_outcomes(outcomes: &[CrawlOutcome]) -> Vec<SitemapEntry> {
    outcomes
        .iter()
        .filter(|o| {
            o.status == PageStatus::Ok
                && o.http_status.is_some_and(|code| (200..300).contains(&code))
                && o.content_type
                    .as_deref()
                    .map_or(true, is_html_content_type)
        })
        .map(|o| SitemapEntry {
            url: o.url.clone(),
            priority: priority_for_depth(o.depth),
            lastmod: o.last_modified.map(|dt| dt.date_naive()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_priority_for_depth() {
        assert!(same_priority(priority_for_depth(0), 1.0));
        assert!(same_priority(priority_for_depth(1), 0.9));
        assert!(same_priority(priority_for_depth(2), 0.8));
        assert!(same_priority(priority_for_depth(9), 0.1));
        // Floor holds past the formula's zero crossing
        assert!(same_priority(priority_for_depth(10), 0.1));
        assert!(same_priority(priority_for_depth(50), 0.1));
    }

    fn outcome(url: &str, depth: u32, status: PageStatus, code: Option<u16>) -> CrawlOutcome {
        CrawlOutcome {
            url: Url::parse(url).unwrap(),
            depth,
            status,
            http_status: code,
            final_url: None,
            content_type: Some("text/html".to_string()),
            last_modified: None,
            has_form: false,
            error: None,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_entries_filter_non_eligible() {
        let outcomes = vec![
            outcome("https://example.com/", 0, PageStatus::Ok, Some(200)),
            outcome("https://example.com/m", 1, PageStatus::Redirect, Some(301)),
            outcome("https://example.com/e", 1, PageStatus::Error, Some(404)),
            outcome("https://example.com/n", 1, PageStatus::NonHtml, Some(200)),
            outcome("https://example.com/r", 1, PageStatus::RobotsDisallowed, None),
            outcome("https://example.com/d", 1, PageStatus::DepthExceeded, None),
            outcome("https://example.com/ok", 2, PageStatus::Ok, Some(204)),
        ];

        let entries = entries_from_outcomes(&outcomes);
        let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/", "https://example.com/ok"]);
        assert!(same_priority(entries[0].priority, 1.0));
        assert!(same_priority(entries[1].priority, 0.8));
    }

    #[test]
    fn test_entries_carry_lastmod_date() {
        let mut o = outcome("https://example.com/", 0, PageStatus::Ok, Some(200));
        o.last_modified = crate::store::parse_last_modified("Wed, 21 Oct 2015 07:28:00 GMT");
        let entries = entries_from_outcomes(&[o]);
        assert_eq!(
            entries[0].lastmod,
            Some(NaiveDate::from_ymd_opt(2015, 10, 21).unwrap())
        );
    }
}
