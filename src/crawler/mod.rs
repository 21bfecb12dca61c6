//! Crawl engine
//!
//! The [`Controller`] owns a crawl from seed to termination: it seeds the
//! frontier, runs a bounded pool of fetch workers, enforces robots and
//! depth policy, and reports progress events until the crawl completes,
//! is cancelled, or fails to start.

mod controller;
mod events;

pub use controller::{CancelHandle, Controller, ControllerState, CrawlReport};
pub use events::{ProgressEvent, Termination};

use crate::config::CrawlConfig;
use crate::Result;

/// Runs one crawl to termination without progress reporting
///
/// Convenience for callers that only want the final report; use
/// [`Controller`] directly for live events or cancellation.
pub async fn crawl(config: CrawlConfig) -> Result<CrawlReport> {
    Controller::new(config)?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_crawl_convenience() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<p>home</p>", "text/html"))
            .mount(&server)
            .await;

        let mut config = CrawlConfig::new(Url::parse(&server.uri()).unwrap());
        config.respect_robots = false;
        let report = crawl(config).await.unwrap();

        assert_eq!(report.termination, Termination::Completed);
        assert_eq!(report.outcomes.len(), 1);
    }
}
