//! Crawler module for recursive page harvesting
//!
//! This module contains the core crawling logic, including:
//! - The visitation ledger and outstanding-work tracker
//! - HTTP fetching
//! - The page extraction walk (text, images, links)
//! - Task dispatch bounded by the admission gate

mod dispatcher;
mod extractor;
mod fetcher;
mod ledger;
mod tracker;

pub use dispatcher::{CrawlTask, Dispatcher};
pub use extractor::{clean_text, extract, parse_page, ExtractionResult, TEXT_TAGS};
pub use fetcher::{build_http_client, fetch_bytes, fetch_url, FetchResult};
pub use ledger::Ledger;
pub use tracker::{WorkGuard, WorkTracker};

use crate::config::{validate, Config};
use crate::output::CrawlReport;
use crate::storage::{prepare_destination, AssetSink};
use crate::url::is_fetchable;
use crate::UrlError;
use std::path::Path;

/// Runs a complete crawl from one seed address
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Validate the configuration and the seed address
/// 2. Create the destination folder for the seed's domain (fatal on failure)
/// 3. Build the HTTP client
/// 4. Dispatch the seed task and, recursively, every discovered link
/// 5. Return a report once the outstanding-work counter reaches zero
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::Config;
/// use sumi_harvest::crawler::crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = crawl(Config::default(), "https://example.com/").await?;
/// println!("Fetched {} pages", report.pages_fetched);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: Config, seed: &str) -> crate::Result<CrawlReport> {
    // A zero-capacity gate would never admit the seed
    validate(&config)?;

    let seed = seed.trim();
    if !is_fetchable(seed) {
        return Err(UrlError::MalformedReference {
            reference: seed.to_string(),
            reason: "seed must be an absolute http(s) address".to_string(),
        }
        .into());
    }

    let destination = prepare_destination(Path::new(&config.output.base_dir), seed)?;
    let sink = AssetSink::create(destination)?;
    let client = build_http_client(&config.crawler)?;

    let dispatcher = Dispatcher::new(&config, client, sink);
    tracing::info!(
        "Saving harvest to {} (max depth {}, {} concurrent fetches)",
        dispatcher.destination().display(),
        config.crawler.max_depth,
        config.crawler.max_concurrent_fetches
    );

    Ok(dispatcher.run(seed).await)
}
