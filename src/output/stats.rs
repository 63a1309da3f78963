//! Crawl statistics gathered while tasks run
//!
//! Counters are plain atomics shared by every task; a `CrawlReport` is a
//! snapshot taken once the crawl is complete.

use crate::state::TaskOutcome;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by concurrent tasks
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages_fetched: AtomicU64,
    claims_rejected: AtomicU64,
    depth_pruned: AtomicU64,
    fetch_failures: AtomicU64,
    parse_failures: AtomicU64,
    children_spawned: AtomicU64,
    links_skipped: AtomicU64,
    text_written: AtomicU64,
    images_saved: AtomicU64,
    images_skipped: AtomicU64,
    image_failures: AtomicU64,
    write_failures: AtomicU64,
}

impl CrawlStats {
    /// Creates zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Records how a task ended
    pub fn record_outcome(&self, outcome: TaskOutcome) {
        let counter = match outcome {
            TaskOutcome::Processed => &self.pages_fetched,
            TaskOutcome::AlreadyClaimed => &self.claims_rejected,
            TaskOutcome::DepthExceeded => &self.depth_pruned,
            TaskOutcome::FetchFailed => &self.fetch_failures,
            TaskOutcome::ParseFailed => &self.parse_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_child_spawned(&self) {
        self.children_spawned.fetch_add(1, Ordering::Relaxed);
    }

    /// Links found on a page but not turned into tasks
    pub fn record_links_skipped(&self, count: u64) {
        self.links_skipped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_text_written(&self) {
        self.text_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_image_saved(&self) {
        self.images_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_image_skipped(&self) {
        self.images_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Image download failed before anything was written
    pub fn record_image_failure(&self) {
        self.image_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A text or image write to disk failed
    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a snapshot of the counters
    pub fn report(
        &self,
        seed: &str,
        addresses_claimed: usize,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> CrawlReport {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        CrawlReport {
            seed: seed.to_string(),
            started_at,
            finished_at,
            addresses_claimed: addresses_claimed as u64,
            pages_fetched: load(&self.pages_fetched),
            claims_rejected: load(&self.claims_rejected),
            depth_pruned: load(&self.depth_pruned),
            fetch_failures: load(&self.fetch_failures),
            parse_failures: load(&self.parse_failures),
            children_spawned: load(&self.children_spawned),
            links_skipped: load(&self.links_skipped),
            text_written: load(&self.text_written),
            images_saved: load(&self.images_saved),
            images_skipped: load(&self.images_skipped),
            image_failures: load(&self.image_failures),
            write_failures: load(&self.write_failures),
        }
    }
}

/// Summary of one finished crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub seed: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub addresses_claimed: u64,
    pub pages_fetched: u64,
    pub claims_rejected: u64,
    pub depth_pruned: u64,
    pub fetch_failures: u64,
    pub parse_failures: u64,
    pub children_spawned: u64,
    pub links_skipped: u64,
    pub text_written: u64,
    pub images_saved: u64,
    pub images_skipped: u64,
    pub image_failures: u64,
    pub write_failures: u64,
}

impl CrawlReport {
    /// Total number of tasks that reached `Done`
    pub fn tasks_finished(&self) -> u64 {
        self.pages_fetched
            + self.claims_rejected
            + self.depth_pruned
            + self.fetch_failures
            + self.parse_failures
    }

    /// Wall-clock duration of the run in seconds
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Prints a crawl report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport) {
    println!("=== Harvest Summary ===\n");

    println!("Seed: {}", report.seed);
    println!("Started: {}", report.started_at.to_rfc3339());
    println!("Finished: {}", report.finished_at.to_rfc3339());
    println!("Duration: {}s", report.duration_seconds());
    println!();

    println!("Pages:");
    println!("  Addresses claimed: {}", report.addresses_claimed);
    println!("  Pages fetched: {}", report.pages_fetched);
    println!("  Already claimed: {}", report.claims_rejected);
    println!("  Depth pruned: {}", report.depth_pruned);
    println!("  Fetch failures: {}", report.fetch_failures);
    println!("  Parse failures: {}", report.parse_failures);
    println!("  Child tasks spawned: {}", report.children_spawned);
    println!("  Links skipped: {}", report.links_skipped);
    println!();

    println!("Artifacts:");
    println!("  Text files written: {}", report.text_written);
    println!("  Images saved: {}", report.images_saved);
    println!("  Images skipped (svg): {}", report.images_skipped);
    println!("  Image download failures: {}", report.image_failures);
    println!("  Write failures: {}", report.write_failures);
}
