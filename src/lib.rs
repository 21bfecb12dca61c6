//! Sitemapper - a site crawler that produces standards-compliant XML sitemaps
//!
//! This library crawls a single site breadth-first, records one outcome per
//! canonical URL, and writes the eligible pages out as a sitemap (splitting
//! into an index plus part files past the per-file URL limit). It also ships
//! a sitemap reader and differ so a fresh crawl can be compared against a
//! previously published sitemap.
//!
//! # Architecture
//!
//! - [`config`] - Crawl configuration with defaults, TOML loading, validation
//! - [`url`] - URL canonicalization and crawl-scope filtering
//! - [`robots`] - robots.txt fetching, parsing, per-origin caching
//! - [`fetch`] - The `FetchBackend` trait with HTTP and headless-Chrome backends
//! - [`frontier`] - Deduplicating FIFO work queue
//! - [`store`] - Append-only crawl result store and aggregate stats
//! - [`crawler`] - The controller driving a bounded worker pool
//! - [`sitemap`] - Entry model, writer, reader, and diff
//! - [`report`] - Forms report export

pub mod config;
pub mod crawler;
pub mod fetch;
pub mod frontier;
pub mod report;
pub mod robots;
pub mod sitemap;
pub mod store;
pub mod url;

use thiserror::Error;

/// Main error type for sitemapper operations
#[derive(Error, Debug)]
pub enum SitemapperError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// URL parsing/normalization errors
    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    /// Fetch backend errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors (sitemap and report files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Sitemap XML parsing errors
    #[error("Sitemap parse error: {0}")]
    SitemapParse(String),

    /// Controller misuse (e.g. running a controller twice)
    #[error("Crawl error: {0}")]
    Crawl(String),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing failed
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration validation failed
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Error, Debug)]
pub enum UrlError {
    /// URL could not be parsed
    #[error("Malformed URL '{url}': {reason}")]
    Malformed { url: String, reason: String },

    /// Scheme is neither http nor https
    #[error("Unsupported scheme in '{0}'")]
    UnsupportedScheme(String),

    /// URL has no host component
    #[error("URL '{0}' has no host")]
    MissingHost(String),
}

/// Result type alias for sitemapper operations
pub type Result<T> = std::result::Result<T, SitemapperError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{CrawlConfig, FetchBackendKind};
pub use crawler::{Controller, ProgressEvent, Termination};
pub use fetch::{FetchBackend, FetchError, FetchResult};
pub use sitemap::{SitemapDiff, SitemapEntry};
pub use store::{CrawlOutcome, CrawlStats, PageStatus};
