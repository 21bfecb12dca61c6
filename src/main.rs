//! Sitemapper main entry point
//!
//! Command-line interface: builds a crawl configuration from arguments or
//! a TOML file, runs the crawl with live progress output, writes the
//! sitemap, and optionally emits a forms report or a diff against a
//! previously published sitemap.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use sitemapper::config::{load_config, Cookie, CrawlConfig, FetchBackendKind};
use sitemapper::crawler::{Controller, ProgressEvent, Termination};
use sitemapper::report::write_forms_report;
use sitemapper::sitemap::{diff_sitemaps, entries_from_outcomes, read_sitemap, write_sitemap};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Sitemapper: crawl a site and generate its XML sitemap
///
/// Crawls breadth-first from a seed URL, respecting robots.txt, and writes
/// a sitemaps.org urlset (or index plus parts past 50 000 URLs).
#[derive(Parser, Debug)]
#[command(name = "sitemapper")]
#[command(version = "1.0.0")]
#[command(about = "Crawl a site and generate its XML sitemap", long_about = None)]
struct Cli {
    /// Seed URL to crawl from
    #[arg(value_name = "URL", required_unless_present = "config")]
    seed_url: Option<Url>,

    /// Path to a TOML configuration file (overrides other crawl options)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output sitemap path (default: sitemap_{host}_{date}.xml)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Maximum link depth from the seed
    #[arg(long, default_value_t = 10)]
    max_depth: u32,

    /// Number of concurrent fetch workers
    #[arg(short, long, default_value_t = 8)]
    concurrency: usize,

    /// Per-fetch timeout in seconds
    #[arg(short, long, default_value_t = 30)]
    timeout: u64,

    /// Fetch backend
    #[arg(long, value_enum, default_value_t = BackendArg::Light)]
    backend: BackendArg,

    /// Show the browser window (rendered backend only)
    #[arg(long)]
    no_headless: bool,

    /// Crawl without consulting robots.txt
    #[arg(long)]
    ignore_robots: bool,

    /// Override the user agent string
    #[arg(long, value_name = "STRING")]
    user_agent: Option<String>,

    /// Cookie sent with every request; repeatable
    #[arg(long = "cookie", value_name = "NAME=VALUE")]
    cookies: Vec<Cookie>,

    /// Also write a JSON report of pages containing forms
    #[arg(long, value_name = "FILE")]
    forms_report: Option<PathBuf>,

    /// Diff the crawl against a previously published sitemap
    #[arg(long, value_name = "FILE")]
    diff: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    /// Plain HTTP fetching
    Light,
    /// Headless Chrome
    Rendered,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    let sitemap_path = config.sitemap_path();
    let seed_url = config.seed_url.clone();

    let mut controller = Controller::new(config).context("Failed to set up the crawl")?;

    // Live progress printing
    if let Some(mut events) = controller.take_events() {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                print_event(event);
            }
        });
    }

    // First Ctrl-C cancels gracefully; the partial crawl still gets written
    let cancel = controller.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Cancellation requested; letting in-flight fetches settle");
            cancel.cancel();
        }
    });

    let report = controller.run().await.context("Crawl failed")?;

    let entries = entries_from_outcomes(&report.outcomes);
    let written = write_sitemap(&entries, &sitemap_path)?;
    match written.first() {
        Some(path) => tracing::info!(
            "Wrote {} URLs across {} file(s), starting at {}",
            entries.len(),
            written.len(),
            path.display()
        ),
        None => tracing::warn!("Crawl produced no sitemap-eligible URLs"),
    }

    if let Some(path) = &cli.forms_report {
        write_forms_report(&report.outcomes, &seed_url, path)?;
    }

    if let Some(previous_path) = &cli.diff {
        let previous = read_sitemap(previous_path)
            .with_context(|| format!("Failed to read {}", previous_path.display()))?;
        let diff = diff_sitemaps(&previous, &entries);
        tracing::info!(
            "Diff against {}: {} added, {} removed, {} changed",
            previous_path.display(),
            diff.added.len(),
            diff.removed.len(),
            diff.changed.len()
        );
        for entry in &diff.added {
            println!("+ {}", entry.url);
        }
        for entry in &diff.removed {
            println!("- {}", entry.url);
        }
        for entry in &diff.changed {
            println!("~ {}", entry.url);
        }
    }

    if report.termination == Termination::Cancelled {
        tracing::warn!("Crawl was cancelled; the sitemap covers the crawled portion only");
    }

    Ok(())
}

/// Builds the crawl configuration from the command line or a TOML file
fn build_config(cli: &Cli) -> anyhow::Result<CrawlConfig> {
    if let Some(path) = &cli.config {
        return load_config(path)
            .with_context(|| format!("Failed to load {}", path.display()));
    }

    // required_unless_present guarantees the seed is there
    let seed_url = cli
        .seed_url
        .clone()
        .context("A seed URL is required without --config")?;

    let mut config = CrawlConfig::new(seed_url);
    config.output_path = cli.output.clone();
    config.max_depth = cli.max_depth;
    config.concurrency = cli.concurrency;
    config.timeout_secs = cli.timeout;
    config.backend = match cli.backend {
        BackendArg::Light => FetchBackendKind::Light,
        BackendArg::Rendered => FetchBackendKind::Rendered,
    };
    config.headless = !cli.no_headless;
    config.respect_robots = !cli.ignore_robots;
    if let Some(user_agent) = &cli.user_agent {
        config.user_agent = user_agent.clone();
    }
    config.cookies = cli.cookies.clone();
    Ok(config)
}

fn print_event(event: ProgressEvent) {
    match event {
        ProgressEvent::Page {
            url,
            depth,
            status,
            http_status,
            error,
        } => match error {
            Some(error) => tracing::warn!("[d{}] {:?} {} ({})", depth, status, url, error),
            None => match http_status {
                Some(code) => tracing::info!("[d{}] {} {} ({:?})", depth, code, url, status),
                None => tracing::info!("[d{}] {:?} {}", depth, status, url),
            },
        },
        ProgressEvent::Stats(stats) => {
            tracing::debug!(
                "{} recorded, {} queued, {} errors, {:.1} URLs/sec",
                stats.recorded,
                stats.queued,
                stats.errors,
                stats.urls_per_second()
            );
        }
        ProgressEvent::Finished(termination) => {
            tracing::info!("Crawl finished: {:?}", termination);
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitemapper=info,warn"),
            1 => EnvFilter::new("sitemapper=debug,info"),
            2 => EnvFilter::new("sitemapper=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
