//! Crawl dispatcher - recursive task scheduling
//!
//! Each submitted task runs on its own tokio task and walks the states in
//! [`TaskState`]. Three shared pieces bound and coordinate the work:
//! - the [`Ledger`], so an address is processed at most once
//! - the admission gate (a semaphore), held only while fetching and parsing
//! - the [`WorkTracker`], which reaches zero when the whole crawl is done
//!
//! Image downloads and child tasks do not hold a gate slot. Total spawned tasks
//! are bounded by depth and branching factor only, while the gate bounds how
//! many pages are on the wire at once.

use crate::config::Config;
use crate::crawler::extractor::{parse_page, ExtractionResult};
use crate::crawler::fetcher::{fetch_bytes, fetch_url, FetchResult};
use crate::crawler::ledger::Ledger;
use crate::crawler::tracker::WorkTracker;
use crate::output::{CrawlReport, CrawlStats};
use crate::state::{TaskOutcome, TaskState};
use crate::storage::{is_skipped_image, AssetSink};
use crate::HarvestError;
use chrono::Utc;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// One unit of recursive work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    /// Absolute address to process
    pub url: String,

    /// Distance from the seed (0 for the seed itself)
    pub depth: u32,
}

impl CrawlTask {
    /// The task for the crawl's starting address
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
        }
    }

    /// A task for a link discovered on this task's page
    pub fn child(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: self.depth + 1,
        }
    }
}

struct Shared {
    max_depth: u32,
    default_scheme: String,
    client: Client,
    sink: AssetSink,
    ledger: Arc<Ledger>,
    gate: Semaphore,
    tracker: WorkTracker,
    stats: Arc<CrawlStats>,
}

/// Schedules crawl tasks and tracks them to completion
///
/// Cheap to clone; every clone shares the same ledger, gate and tracker.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Creates a dispatcher with a fresh ledger
    pub fn new(config: &Config, client: Client, sink: AssetSink) -> Self {
        Self::with_ledger(config, client, sink, Arc::new(Ledger::new()))
    }

    /// Creates a dispatcher that claims addresses in an existing ledger
    pub fn with_ledger(config: &Config, client: Client, sink: AssetSink, ledger: Arc<Ledger>) -> Self {
        Self {
            shared: Arc::new(Shared {
                max_depth: config.crawler.max_depth,
                default_scheme: config.output.default_scheme.clone(),
                client,
                sink,
                ledger,
                gate: Semaphore::new(config.crawler.max_concurrent_fetches),
                tracker: WorkTracker::new(),
                stats: Arc::new(CrawlStats::new()),
            }),
        }
    }

    /// The ledger addresses are claimed in
    pub fn ledger(&self) -> &Ledger {
        &self.shared.ledger
    }

    /// Live crawl counters
    pub fn stats(&self) -> &CrawlStats {
        &self.shared.stats
    }

    /// Tasks submitted but not yet finished
    pub fn outstanding(&self) -> usize {
        self.shared.tracker.outstanding()
    }

    /// Admission gate slots currently free
    pub fn available_slots(&self) -> usize {
        self.shared.gate.available_permits()
    }

    /// Where this dispatcher's artifacts are written
    pub fn destination(&self) -> PathBuf {
        self.shared.sink.root().to_path_buf()
    }

    /// Crawls from `seed` and returns once every spawned task has finished
    pub async fn run(&self, seed: &str) -> CrawlReport {
        let started_at = Utc::now();
        tracing::info!("Starting harvest from {}", seed);

        self.submit(CrawlTask::seed(seed));
        self.wait().await;

        let report = self.shared.stats.report(
            seed,
            self.shared.ledger.len(),
            started_at,
            Utc::now(),
        );
        tracing::info!(
            "Harvest complete: {} pages fetched, {} images saved",
            report.pages_fetched,
            report.images_saved
        );
        report
    }

    /// Submits a task; it runs concurrently with everything else
    ///
    /// The outstanding-work counter is incremented before this returns and
    /// decremented when the task reaches `Done`.
    pub fn submit(&self, task: CrawlTask) {
        let guard = self.shared.tracker.begin();
        let dispatcher = self.clone();

        tokio::spawn(async move {
            let outcome = dispatcher.process(&task).await;
            dispatcher.shared.stats.record_outcome(outcome);
            tracing::trace!(url = %task.url, depth = task.depth, %outcome, "task finished");
            drop(guard);
        });
    }

    /// Waits until the outstanding-work counter reaches zero
    pub async fn wait(&self) {
        self.shared.tracker.wait_idle().await;
    }

    async fn process(&self, task: &CrawlTask) -> TaskOutcome {
        let shared = &*self.shared;
        let mut state = TaskState::Pending;
        advance(task, &mut state, TaskState::Claiming);

        // Depth is checked first so a deep visit never claims an address a
        // shallower path could still reach
        let rejection = if task.depth >= shared.max_depth {
            Some(TaskOutcome::DepthExceeded)
        } else if !shared.ledger.claim(&task.url) {
            Some(TaskOutcome::AlreadyClaimed)
        } else {
            None
        };
        if let Some(outcome) = rejection {
            advance(task, &mut state, TaskState::Rejected);
            advance(task, &mut state, TaskState::Done);
            return outcome;
        }

        advance(task, &mut state, TaskState::Admitted);
        let permit = match shared.gate.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::warn!("Admission gate closed for {}: {}", task.url, e);
                advance(task, &mut state, TaskState::Fetching);
                advance(task, &mut state, TaskState::Done);
                return TaskOutcome::FetchFailed;
            }
        };

        advance(task, &mut state, TaskState::Fetching);
        tracing::info!("Scraping: {} (depth {})", task.url, task.depth);

        let (final_url, body, content_type) = match fetch_url(&shared.client, &task.url).await {
            FetchResult::Success {
                final_url,
                status_code,
                content_type,
                body,
            } => {
                tracing::debug!("Fetched {} (HTTP {})", task.url, status_code);
                if final_url != task.url {
                    tracing::debug!("{} redirected to {}", task.url, final_url);
                }
                (final_url, body, content_type)
            }
            FetchResult::HttpError { status_code } => {
                tracing::warn!("Failed to retrieve {}: HTTP {}", task.url, status_code);
                advance(task, &mut state, TaskState::Done);
                return TaskOutcome::FetchFailed;
            }
            FetchResult::NetworkError { error } => {
                tracing::warn!("Failed to retrieve {}: {}", task.url, error);
                advance(task, &mut state, TaskState::Done);
                return TaskOutcome::FetchFailed;
            }
        };

        advance(task, &mut state, TaskState::Parsing);
        // References on a redirected page are relative to where it was served from
        let extraction = match parse_page(
            &body,
            content_type.as_deref(),
            &final_url,
            &shared.default_scheme,
        ) {
            Ok(extraction) => extraction,
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", task.url, e);
                advance(task, &mut state, TaskState::Done);
                return TaskOutcome::ParseFailed;
            }
        };

        // Fetch/parse is over; downloads and recursion run outside the gate
        debug_assert!(state.holds_gate_slot());
        drop(permit);
        advance(task, &mut state, TaskState::DispatchingChildren);

        self.save_images(&extraction.images).await;
        self.save_text(task, &extraction).await;
        self.spawn_children(task, extraction.links);

        advance(task, &mut state, TaskState::Done);
        TaskOutcome::Processed
    }

    /// Downloads every image of one page concurrently and waits for all of them
    async fn save_images(&self, images: &[String]) {
        let mut downloads = JoinSet::new();

        for image_url in images {
            if is_skipped_image(image_url) {
                tracing::debug!("Skipped SVG image: {}", image_url);
                self.shared.stats.record_image_skipped();
                continue;
            }

            let shared = Arc::clone(&self.shared);
            let image_url = image_url.clone();
            downloads.spawn(async move {
                match download_image(&shared.client, &shared.sink, &image_url).await {
                    Ok(path) => {
                        tracing::info!("Downloaded image: {}", path.display());
                        shared.stats.record_image_saved();
                    }
                    Err(HarvestError::Storage(e)) => {
                        tracing::warn!("Failed to save image {}: {}", image_url, e);
                        shared.stats.record_write_failure();
                    }
                    Err(e) => {
                        tracing::warn!("Failed to download image {}: {}", image_url, e);
                        shared.stats.record_image_failure();
                    }
                }
            });
        }

        while let Some(joined) = downloads.join_next().await {
            if let Err(e) = joined {
                tracing::warn!("Image download task aborted: {}", e);
                self.shared.stats.record_image_failure();
            }
        }
    }

    async fn save_text(&self, task: &CrawlTask, extraction: &ExtractionResult) {
        let text = extraction.text();
        match self
            .shared
            .sink
            .write_text(task.depth, &task.url, &text)
            .await
        {
            Ok(path) => {
                tracing::debug!("Saved text for {} to {}", task.url, path.display());
                self.shared.stats.record_text_written();
            }
            Err(e) => {
                tracing::warn!("Failed to save text from {}: {}", task.url, e);
                self.shared.stats.record_write_failure();
            }
        }
    }

    fn spawn_children(&self, task: &CrawlTask, links: Vec<String>) {
        let shared = &*self.shared;

        // Children at the bound would only be rejected; never create them
        if task.depth + 1 >= shared.max_depth {
            shared.stats.record_links_skipped(links.len() as u64);
            return;
        }

        for link in links {
            // Advisory pre-check; the child's own claim stays authoritative
            if shared.ledger.contains(&link) {
                shared.stats.record_links_skipped(1);
                continue;
            }
            shared.stats.record_child_spawned();
            self.submit(task.child(link));
        }
    }
}

async fn download_image(
    client: &Client,
    sink: &AssetSink,
    image_url: &str,
) -> Result<PathBuf, HarvestError> {
    let bytes = fetch_bytes(client, image_url).await?;
    let path = sink.write_image(image_url, &bytes).await?;
    Ok(path)
}

fn advance(task: &CrawlTask, state: &mut TaskState, next: TaskState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal task transition {} -> {}",
        state,
        next
    );
    tracing::trace!(url = %task.url, depth = task.depth, "{} -> {}", state, next);
    *state = next;
}
