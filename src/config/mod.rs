//! Configuration module
//!
//! Crawl configuration with sensible defaults, optional TOML file loading,
//! and a validation pass run before any crawl starts.
//!
//! # Example
//!
//! ```no_run
//! use sitemapper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sitemapper.toml")).unwrap();
//! println!("Crawling {} to depth {}", config.seed_url, config.max_depth);
//! ```

mod parser;
mod types;
mod validation;

pub use parser::load_config;
pub use types::{Cookie, CrawlConfig, FetchBackendKind, DEFAULT_USER_AGENT};
pub use validation::validate_config;
