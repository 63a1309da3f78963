//! Output module for reporting on a finished crawl
//!
//! Provides the shared counters tasks update while running and the summary
//! printed once the outstanding-work counter reaches zero.

mod stats;

pub use stats::{print_report, CrawlReport, CrawlStats};
