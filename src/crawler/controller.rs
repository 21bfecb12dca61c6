//! Crawl controller
//!
//! Drives a crawl with a fixed pool of worker tasks sharing the frontier,
//! the result store, and the robots cache. The crawl is finished when the
//! frontier is empty and no fetch is in flight; cancellation stops new
//! fetches immediately and lets in-flight ones settle.

use crate::config::{CrawlConfig, FetchBackendKind};
use crate::crawler::events::{ProgressEvent, Termination};
use crate::fetch::{FetchBackend, FetchError, FetchResult, LightFetcher, RenderedFetcher};
use crate::frontier::{Frontier, FrontierItem};
use crate::robots::RobotsCache;
use crate::store::{parse_last_modified, CrawlOutcome, CrawlResultStore, CrawlStats, PageStatus};
use crate::url::{align_scheme, is_crawlable_path, is_same_host, normalize};
use crate::{Result, SitemapperError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use url::Url;

/// Lifecycle of a controller; a controller runs exactly one crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// Cooperative cancellation handle
///
/// Cloneable and callable from anywhere (signal handlers, other tasks).
/// Cancelling is idempotent.
#[derive(Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Everything a finished crawl produced
pub struct CrawlReport {
    pub termination: Termination,
    pub stats: CrawlStats,
    pub outcomes: Vec<CrawlOutcome>,
}

/// Shared state cloned into every worker task
struct WorkerContext {
    config: Arc<CrawlConfig>,
    frontier: Arc<Frontier>,
    store: Arc<CrawlResultStore>,
    robots: Arc<RobotsCache>,
    backend: Arc<dyn FetchBackend>,
    cancel: CancelHandle,
    in_flight: Arc<AtomicUsize>,
    events: mpsc::UnboundedSender<ProgressEvent>,
}

impl Clone for WorkerContext {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            frontier: self.frontier.clone(),
            store: self.store.clone(),
            robots: self.robots.clone(),
            backend: self.backend.clone(),
            cancel: self.cancel.clone(),
            in_flight: self.in_flight.clone(),
            events: self.events.clone(),
        }
    }
}

/// Single-use crawl driver
pub struct Controller {
    config: Arc<CrawlConfig>,
    frontier: Arc<Frontier>,
    store: Arc<CrawlResultStore>,
    robots: Arc<RobotsCache>,
    cancel: CancelHandle,
    events_tx: mpsc::UnboundedSender<ProgressEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<ProgressEvent>>,
    state: ControllerState,
}

impl Controller {
    /// Creates a controller for one crawl
    ///
    /// The configuration is validated here so a bad config fails before
    /// anything is fetched.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        crate::config::validate_config(&config)?;
        let robots = RobotsCache::new(config.respect_robots, &config.user_agent)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config: Arc::new(config),
            frontier: Arc::new(Frontier::new()),
            store: Arc::new(CrawlResultStore::new()),
            robots: Arc::new(robots),
            cancel: CancelHandle::default(),
            events_tx,
            events_rx: Some(events_rx),
            state: ControllerState::Idle,
        })
    }

    /// Handle for cancelling this crawl from another task
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Takes the progress event receiver; only the first caller gets it
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<ProgressEvent>> {
        self.events_rx.take()
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Runs the crawl to termination
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The crawl ran; the report says whether it
    ///   completed or was cancelled
    /// * `Err(SitemapperError)` - The crawl never started (controller
    ///   reuse or backend launch failure)
    pub async fn run(&mut self) -> Result<CrawlReport> {
        if self.state != ControllerState::Idle {
            return Err(SitemapperError::Crawl(
                "controller already ran; create a new one per crawl".to_string(),
            ));
        }
        self.state = ControllerState::Running;

        let backend = match self.build_backend().await {
            Ok(backend) => backend,
            Err(e) => {
                self.state = ControllerState::Failed;
                let _ = self.events_tx.send(ProgressEvent::Finished(Termination::Failed));
                return Err(e);
            }
        };

        let seed = normalize(self.config.seed_url.as_str(), None)?;
        tracing::info!(
            "Starting crawl of {} (depth {}, {} workers, {:?} backend)",
            seed,
            self.config.max_depth,
            self.config.concurrency,
            self.config.backend
        );
        self.frontier.push(FrontierItem {
            url: seed,
            depth: 0,
            discovered_from: None,
        });

        let context = WorkerContext {
            config: self.config.clone(),
            frontier: self.frontier.clone(),
            store: self.store.clone(),
            robots: self.robots.clone(),
            backend: backend.clone(),
            cancel: self.cancel.clone(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            events: self.events_tx.clone(),
        };

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.concurrency {
            let context = context.clone();
            workers.spawn(async move { worker_loop(context, worker_id).await });
        }

        let mut stats_tick = tokio::time::interval(Duration::from_secs(1));
        stats_tick.tick().await; // first tick fires immediately
        loop {
            tokio::select! {
                joined = workers.join_next() => {
                    match joined {
                        Some(Err(e)) => tracing::error!("Worker task panicked: {}", e),
                        Some(Ok(())) => {}
                        None => break,
                    }
                }
                _ = stats_tick.tick() => {
                    let stats = self.store.stats(self.frontier.len());
                    let _ = self.events_tx.send(ProgressEvent::Stats(stats));
                }
            }
        }

        backend.shutdown().await;

        let termination = if self.cancel.is_cancelled() {
            Termination::Cancelled
        } else {
            Termination::Completed
        };
        self.state = match termination {
            Termination::Cancelled => ControllerState::Cancelled,
            _ => ControllerState::Completed,
        };

        let stats = self.store.stats(self.frontier.len());
        tracing::info!(
            "Crawl {:?}: {} outcomes, {} errors, {:.1} URLs/sec",
            termination,
            stats.recorded,
            stats.errors,
            stats.urls_per_second()
        );
        let _ = self.events_tx.send(ProgressEvent::Stats(stats.clone()));
        let _ = self.events_tx.send(ProgressEvent::Finished(termination));

        Ok(CrawlReport {
            termination,
            stats,
            outcomes: self.store.snapshot(),
        })
    }

    async fn build_backend(&self) -> Result<Arc<dyn FetchBackend>> {
        match self.config.backend {
            FetchBackendKind::Light => {
                let fetcher = LightFetcher::new(&self.config)?;
                Ok(Arc::new(fetcher))
            }
            FetchBackendKind::Rendered => {
                let fetcher = RenderedFetcher::launch(&self.config).await?;
                Ok(Arc::new(fetcher))
            }
        }
    }
}

/// Worker main loop
///
/// The in-flight counter is raised before the pop so that a worker holding
/// an item is always visible to the others; "frontier empty and nothing in
/// flight" is then a safe termination condition.
async fn worker_loop(ctx: WorkerContext, worker_id: usize) {
    tracing::debug!("Worker {} started", worker_id);
    loop {
        if ctx.cancel.is_cancelled() {
            break;
        }

        ctx.in_flight.fetch_add(1, Ordering::AcqRel);
        match ctx.frontier.pop() {
            Some(item) => {
                process_item(&ctx, item).await;
                ctx.in_flight.fetch_sub(1, Ordering::AcqRel);
            }
            None => {
                ctx.in_flight.fetch_sub(1, Ordering::AcqRel);
                if ctx.frontier.is_empty() && ctx.in_flight.load(Ordering::Acquire) == 0 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
        }
    }
    tracing::debug!("Worker {} finished", worker_id);
}

/// Handles one frontier item end to end
async fn process_item(ctx: &WorkerContext, item: FrontierItem) {
    match &item.discovered_from {
        Some(parent) => tracing::trace!("Fetching {} (depth {}, via {})", item.url, item.depth, parent),
        None => tracing::trace!("Fetching seed {}", item.url),
    }

    if !ctx.robots.allowed(&item.url).await {
        tracing::debug!("robots.txt disallows {}", item.url);
        record(
            ctx,
            CrawlOutcome::skipped(item.url.clone(), item.depth, PageStatus::RobotsDisallowed),
        );
        return;
    }

    if ctx.cancel.is_cancelled() {
        return;
    }

    let fetched = fetch_with_retries(ctx, &item.url).await;

    // Cancellation between fetch and expansion: the settled fetch is still
    // recorded, its links are not followed.
    let expand = !ctx.cancel.is_cancelled();

    let outcome = match fetched {
        Ok(result) => {
            if expand {
                expand_links(ctx, &item, &result);
            }
            outcome_from_result(&item, result)
        }
        Err(e) => outcome_from_error(&item, e),
    };

    record(ctx, outcome);
}

async fn fetch_with_retries(ctx: &WorkerContext, url: &Url) -> std::result::Result<FetchResult, FetchError> {
    let mut attempt: u32 = 0;
    loop {
        match ctx.backend.fetch(url).await {
            Ok(result) => return Ok(result),
            Err(e)
                if e.is_retryable()
                    && attempt < ctx.config.max_retries
                    && !ctx.cancel.is_cancelled() =>
            {
                attempt += 1;
                tracing::debug!("Retry {} for {} after: {}", attempt, url, e);
                tokio::time::sleep(Duration::from_secs(2 * attempt as u64)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn outcome_from_result(item: &FrontierItem, result: FetchResult) -> CrawlOutcome {
    let status = if result.redirected {
        if is_same_host(&item.url, &result.final_url) {
            PageStatus::Redirect
        } else {
            PageStatus::RedirectExternal
        }
    } else if (200..300).contains(&result.status) {
        PageStatus::Ok
    } else {
        PageStatus::Error
    };

    let error = match status {
        PageStatus::Error => Some(format!("HTTP {}", result.status)),
        _ => None,
    };

    CrawlOutcome {
        url: item.url.clone(),
        depth: item.depth,
        status,
        http_status: Some(result.status),
        final_url: (result.final_url != item.url).then_some(result.final_url),
        content_type: (!result.content_type.is_empty()).then_some(result.content_type),
        last_modified: result.last_modified.as_deref().and_then(parse_last_modified),
        has_form: result.has_form,
        error,
        recorded_at: chrono::Utc::now(),
    }
}

fn outcome_from_error(item: &FrontierItem, error: FetchError) -> CrawlOutcome {
    let mut outcome = CrawlOutcome::skipped(item.url.clone(), item.depth, PageStatus::Error);
    match error {
        FetchError::NonHtml {
            status,
            content_type,
        } => {
            outcome.status = PageStatus::NonHtml;
            outcome.http_status = Some(status);
            outcome.content_type = Some(content_type);
        }
        other => {
            outcome.error = Some(other.to_string());
        }
    }
    outcome
}

/// Filters and enqueues the links of a fetched page
///
/// Depth-exceeded URLs get an outcome here, at discovery, without ever
/// being fetched.
fn expand_links(ctx: &WorkerContext, item: &FrontierItem, result: &FetchResult) {
    for link in &result.links {
        let Ok(normalized) = normalize(link.as_str(), Some(&result.final_url)) else {
            continue;
        };
        let url = align_scheme(normalized, &ctx.config.seed_url);

        if !is_same_host(&url, &ctx.config.seed_url) || !is_crawlable_path(&url) {
            continue;
        }

        let child_depth = item.depth + 1;
        if child_depth > ctx.config.max_depth {
            if ctx.frontier.mark_visited(&url, child_depth) {
                record(
                    ctx,
                    CrawlOutcome::skipped(url, child_depth, PageStatus::DepthExceeded),
                );
            }
        } else {
            ctx.frontier.push(FrontierItem {
                url,
                depth: child_depth,
                discovered_from: Some(item.url.clone()),
            });
        }
    }
}

/// Records an outcome and emits its event; duplicates are dropped silently
fn record(ctx: &WorkerContext, outcome: CrawlOutcome) {
    let event = ProgressEvent::Page {
        url: outcome.url.clone(),
        depth: outcome.depth,
        status: outcome.status,
        http_status: outcome.http_status,
        error: outcome.error.clone(),
    };
    if ctx.store.record(outcome) {
        let _ = ctx.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_handle() {
        let handle = CancelHandle::default();
        assert!(!handle.is_cancelled());

        let clone = handle.clone();
        clone.cancel();
        assert!(handle.is_cancelled());

        // Idempotent
        handle.cancel();
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_at_construction() {
        let mut config = CrawlConfig::new(Url::parse("https://example.com/").unwrap());
        config.concurrency = 0;
        assert!(Controller::new(config).is_err());
    }

    #[tokio::test]
    async fn test_controller_is_single_use() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_raw("<p>empty</p>", "text/html"),
            )
            .mount(&server)
            .await;

        let mut config = CrawlConfig::new(Url::parse(&server.uri()).unwrap());
        config.respect_robots = false;
        let mut controller = Controller::new(config).unwrap();

        assert_eq!(controller.state(), ControllerState::Idle);
        let report = controller.run().await.unwrap();
        assert_eq!(report.termination, Termination::Completed);
        assert_eq!(controller.state(), ControllerState::Completed);

        assert!(controller.run().await.is_err());
    }
}
