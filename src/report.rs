//! Forms report
//!
//! JSON export of the pages where a form was found, useful as a worklist
//! for contact-page and search-page audits. Only pages that answered 2xx
//! make the list.

use crate::store::CrawlOutcome;
use crate::Result;
use chrono::Local;
use serde::Serialize;
use std::path::Path;
use url::Url;

/// One page carrying a form
#[derive(Debug, Serialize, PartialEq)]
pub struct FormPage {
    pub url: String,
    pub depth: u32,
}

#[derive(Serialize)]
struct FormsReport<'a> {
    #[serde(rename = "generated-at")]
    generated_at: String,
    #[serde(rename = "seed-url")]
    seed_url: &'a str,
    pages: Vec<FormPage>,
}

/// Collects the form pages from crawl outcomes in recording order
pub fn form_pages(outcomes: &[CrawlOutcome]) -> Vec<FormPage> {
    outcomes
        .iter()
        .filter(|o| {
            o.has_form
                && o.http_status.is_some_and(|code| (200..300).contains(&code))
        })
        .map(|o| FormPage {
            url: o.url.to_string(),
            depth: o.depth,
        })
        .collect()
}

/// Writes the forms report as pretty-printed JSON
pub fn write_forms_report(outcomes: &[CrawlOutcome], seed_url: &Url, path: &Path) -> Result<()> {
    let report = FormsReport {
        generated_at: Local::now().format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
        seed_url: seed_url.as_str(),
        pages: form_pages(outcomes),
    };
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| crate::SitemapperError::Crawl(format!("forms report: {}", e)))?;
    std::fs::write(path, json)?;
    tracing::info!("Forms report written to {:?}", path);
    Ok(())
}
