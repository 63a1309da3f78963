//! State module for tracking crawl task progress
//!
//! # Components
//!
//! - `TaskState`: the phase a crawl task is in (claiming, fetching, parsing, ...)
//! - `TaskOutcome`: how a crawl task ended

mod task_state;

// Re-export main types
pub use task_state::{TaskOutcome, TaskState};
