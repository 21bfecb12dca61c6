use chrono::Local;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default user agent, matching a current desktop browser so rendered and
/// light fetches present the same identity.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration for a single crawl
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Seed URL the crawl starts from; also defines the crawl scope (host)
    #[serde(rename = "seed-url")]
    pub seed_url: Url,

    /// Output sitemap path; derived from the seed host and date when unset
    #[serde(rename = "output-path", default)]
    pub output_path: Option<PathBuf>,

    /// Maximum link depth from the seed (seed is depth 0)
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Number of concurrent fetch workers
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-fetch timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Fetch backend selection
    #[serde(default)]
    pub backend: FetchBackendKind,

    /// Run the rendered backend's browser without a window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Consult robots.txt before fetching
    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,

    /// User agent sent by both backends and used for robots.txt matching
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Cookies attached to every fetch
    #[serde(default)]
    pub cookies: Vec<Cookie>,

    /// Retries for transient fetch failures before an error outcome
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,
}

/// Which fetch backend a crawl uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchBackendKind {
    /// Plain HTTP fetching, no script execution
    #[default]
    Light,
    /// Headless Chrome via CDP, sees script-inserted links
    Rendered,
}

/// A single cookie sent with every request
#[derive(Debug, Clone, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl FromStr for Cookie {
    type Err = String;

    /// Parses the `name=value` form used on the command line
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => Ok(Cookie {
                name: name.trim().to_string(),
                value: value.trim().to_string(),
            }),
            _ => Err(format!("expected NAME=VALUE, got '{}'", s)),
        }
    }
}

impl CrawlConfig {
    /// Creates a configuration with default settings for the given seed
    pub fn new(seed_url: Url) -> Self {
        CrawlConfig {
            seed_url,
            output_path: None,
            max_depth: default_max_depth(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            backend: FetchBackendKind::default(),
            headless: true,
            respect_robots: true,
            user_agent: default_user_agent(),
            cookies: Vec::new(),
            max_retries: default_max_retries(),
        }
    }

    /// Per-fetch timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The sitemap path to write, deriving `sitemap_{host}_{date}.xml`
    /// next to the working directory when none was configured.
    pub fn sitemap_path(&self) -> PathBuf {
        match &self.output_path {
            Some(path) => path.clone(),
            None => {
                let host = self.seed_url.host_str().unwrap_or("site");
                let date = Local::now().format("%Y-%m-%d");
                PathBuf::from(format!("sitemap_{}_{}.xml", host, date))
            }
        }
    }

    /// Cookie header value for the light backend (`name=value; name=value`)
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let joined = self
            .cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        Some(joined)
    }
}

fn default_max_depth() -> u32 {
    10
}

fn default_concurrency() -> usize {
    8
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
