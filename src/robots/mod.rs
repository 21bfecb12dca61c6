//! Robots.txt handling module
//!
//! Fetches, parses, and caches robots.txt policies. One policy is held per
//! origin for the lifetime of a crawl; concurrent first requests for the same
//! origin trigger exactly one fetch.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::RobotsPolicy;
