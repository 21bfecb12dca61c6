//! Light HTTP fetch backend
//!
//! Plain HTTP fetching with reqwest. Redirects are followed manually so the
//! original 3xx status can be recorded alongside the final URL, and so the
//! hop cap is enforced exactly.

use crate::config::CrawlConfig;
use crate::fetch::{
    is_html_content_type, parse_html, FetchBackend, FetchError, FetchResult, REDIRECT_CAP,
};
use crate::url::is_same_host;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE, LAST_MODIFIED, LOCATION};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// HTTP fetch backend without script execution
pub struct LightFetcher {
    client: Client,
    cookie_header: Option<String>,
}

impl LightFetcher {
    /// Builds the backend from the crawl configuration
    ///
    /// The client accepts invalid certificates: a sitemap of a staging host
    /// with a self-signed certificate is still a sitemap.
    pub fn new(config: &CrawlConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::none()) // Handle redirects manually
            .danger_accept_invalid_certs(true)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            cookie_header: config.cookie_header(),
        })
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response, FetchError> {
        let mut request = self.client.get(url.as_str());
        if let Some(cookies) = &self.cookie_header {
            request = request.header(COOKIE, cookies);
        }
        request.send().await.map_err(classify_error)
    }
}

#[async_trait]
impl FetchBackend for LightFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let mut current = url.clone();
        let mut first_redirect_status: Option<u16> = None;
        let mut hops = 0usize;

        let response = loop {
            let response = self.get(&current).await?;
            let status = response.status();

            if !status.is_redirection() {
                break response;
            }

            first_redirect_status.get_or_insert(status.as_u16());
            hops += 1;
            if hops > REDIRECT_CAP {
                return Err(FetchError::TooManyRedirects);
            }

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    FetchError::ConnectionFailed(format!(
                        "{} answered {} without a Location header",
                        current, status
                    ))
                })?;

            current = current.join(location).map_err(|e| {
                FetchError::ConnectionFailed(format!("unresolvable redirect location: {}", e))
            })?;
        };

        let terminal_status = response.status().as_u16();
        let status = first_redirect_status.unwrap_or(terminal_status);
        let redirected = first_redirect_status.is_some();
        let final_url = current;

        let content_type = header_string(&response, CONTENT_TYPE);
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // A chain that left the requested host is recorded without reading
        // the body; its links belong to the other site.
        if redirected && !is_same_host(url, &final_url) {
            return Ok(FetchResult {
                status,
                final_url,
                redirected,
                content_type,
                last_modified,
                links: Vec::new(),
                has_form: false,
            });
        }

        if !is_html_content_type(&content_type) {
            return Err(FetchError::NonHtml {
                status,
                content_type,
            });
        }

        let body = response.text().await.map_err(classify_error)?;
        let parsed = parse_html(&body, &final_url);

        Ok(FetchResult {
            status,
            final_url,
            redirected,
            content_type,
            last_modified,
            links: parsed.links,
            has_form: parsed.has_form,
        })
    }
}

fn header_string(response: &reqwest::Response, name: reqwest::header::HeaderName) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

/// Maps reqwest errors onto the fetch error taxonomy
fn classify_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::ConnectionFailed(e.to_string())
    }
}
