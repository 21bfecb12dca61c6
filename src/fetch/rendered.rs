//! Rendered fetch backend
//!
//! Drives a headless Chrome over the DevTools protocol. Navigation status
//! and headers come from network events (the first HTML document response is
//! the navigation response, also after redirects); links and form presence
//! are read from the live DOM so script-inserted content is seen.

use crate::config::CrawlConfig;
use crate::fetch::{is_html_content_type, FetchBackend, FetchError, FetchResult};
use crate::url::is_same_host;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, EventResponseReceived};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

/// JS run in the page to collect anchor hrefs
const COLLECT_LINKS_JS: &str =
    "Array.from(document.querySelectorAll('a[href]')).map(a => a.href)\
     .filter(h => h.startsWith('http'))";

/// JS run in the page to detect forms
const DETECT_FORM_JS: &str = "document.querySelectorAll('form').length > 0";

/// Headless-Chrome fetch backend
///
/// The browser sits behind a mutex because closing it needs exclusive
/// access; the lock is only held for the moment of page creation, never
/// across a navigation.
pub struct RenderedFetcher {
    browser: tokio::sync::Mutex<Browser>,
    handler_task: JoinHandle<()>,
    timeout: Duration,
    user_agent: String,
    cookies: Vec<(String, String)>,
}

impl RenderedFetcher {
    /// Launches the browser
    ///
    /// Chrome is located through chromiumoxide's executable detection. The
    /// returned handler stream must be polled for the browser to make any
    /// progress, so it is drained on a background task tied to this fetcher.
    pub async fn launch(config: &CrawlConfig) -> Result<Self, FetchError> {
        let mut builder = BrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(FetchError::Browser)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| FetchError::Browser(format!("failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: tokio::sync::Mutex::new(browser),
            handler_task,
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            cookies: config
                .cookies
                .iter()
                .map(|c| (c.name.clone(), c.value.clone()))
                .collect(),
        })
    }

    async fn fetch_on_page(&self, page: &Page, url: &Url) -> Result<FetchResult, FetchError> {
        page.set_user_agent(self.user_agent.as_str())
            .await
            .map_err(browser_err)?;

        if !self.cookies.is_empty() {
            let mut params = Vec::with_capacity(self.cookies.len());
            for (name, value) in &self.cookies {
                let param = CookieParam::builder()
                    .name(name.clone())
                    .value(value.clone())
                    .url(url.as_str())
                    .build()
                    .map_err(FetchError::Browser)?;
                params.push(param);
            }
            page.set_cookies(params).await.map_err(browser_err)?;
        }

        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(browser_err)?;

        page.goto(url.as_str()).await.map_err(browser_err)?;
        page.wait_for_navigation().await.map_err(browser_err)?;

        // The first HTML document response on this page is the navigation
        // response; subresources carry other mime types. Events already
        // emitted during navigation are buffered in the listener.
        let mut status: u16 = 0;
        let mut content_type = String::new();
        let mut last_modified: Option<String> = None;
        loop {
            let next = tokio::time::timeout(Duration::from_millis(500), responses.next()).await;
            match next {
                Ok(Some(event)) => {
                    if is_html_mime(&event.response.mime_type) {
                        status = event.response.status as u16;
                        content_type = event.response.mime_type.clone();
                        last_modified = header_value(&event.response.headers, "last-modified");
                        break;
                    }
                }
                _ => break,
            }
        }

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|s| Url::parse(&s).ok())
            .unwrap_or_else(|| url.clone());
        let redirected = final_url != *url;

        if redirected && !is_same_host(url, &final_url) {
            return Ok(FetchResult {
                status: if status == 0 { 302 } else { status },
                final_url,
                redirected,
                content_type,
                last_modified,
                links: Vec::new(),
                has_form: false,
            });
        }

        if !content_type.is_empty() && !is_html_content_type(&content_type) {
            return Err(FetchError::NonHtml {
                status,
                content_type,
            });
        }

        let raw_links: Vec<String> = page
            .evaluate(COLLECT_LINKS_JS)
            .await
            .map_err(browser_err)?
            .into_value()
            .map_err(|e| FetchError::Browser(e.to_string()))?;
        let links = raw_links
            .iter()
            .filter_map(|href| Url::parse(href).ok())
            .collect();

        let has_form: bool = page
            .evaluate(DETECT_FORM_JS)
            .await
            .map_err(browser_err)?
            .into_value()
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        Ok(FetchResult {
            status: if status == 0 { 200 } else { status },
            final_url,
            redirected,
            content_type,
            last_modified,
            links,
            has_form,
        })
    }
}

#[async_trait]
impl FetchBackend for RenderedFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let page = {
            let browser = self.browser.lock().await;
            browser.new_page("about:blank").await.map_err(browser_err)?
        };

        // The page is closed on every path; leaked pages accumulate in the
        // browser process across a long crawl.
        let result = match tokio::time::timeout(self.timeout, self.fetch_on_page(&page, url)).await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };

        if let Err(e) = page.close().await {
            tracing::debug!("Page close failed for {}: {}", url, e);
        }

        result
    }

    async fn shutdown(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            tracing::debug!("Browser close failed: {}", e);
        }
        self.handler_task.abort();
    }
}

fn browser_err(e: chromiumoxide::error::CdpError) -> FetchError {
    FetchError::Browser(e.to_string())
}

fn is_html_mime(mime: &str) -> bool {
    let mime = mime.to_ascii_lowercase();
    mime.starts_with("text/html") || mime.starts_with("application/xhtml+xml")
}

/// Case-insensitive lookup in the CDP header object
fn header_value(
    headers: &chromiumoxide::cdp::browser_protocol::network::Headers,
    name: &str,
) -> Option<String> {
    let value = serde_json::to_value(headers).ok()?;
    let map = value.as_object()?;
    map.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, v)| v.as_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_html_mime() {
        assert!(is_html_mime("text/html"));
        assert!(is_html_mime("Text/HTML; charset=utf-8"));
        assert!(is_html_mime("application/xhtml+xml"));
        assert!(!is_html_mime("application/json"));
        assert!(!is_html_mime("image/svg+xml"));
    }
}
