/// Task state definitions for tracking one crawl task from claim to completion
///
/// Every task walks the same path:
/// `Pending -> Claiming -> (Rejected | Admitted) -> Fetching -> Parsing -> DispatchingChildren -> Done`,
/// with `Fetching` and `Parsing` allowed to short-circuit to `Done` on failure.
use std::fmt;

/// Represents the current phase of a crawl task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Task was submitted but has not run yet
    Pending,

    /// Checking the depth bound and claiming the address in the ledger
    Claiming,

    /// Address already claimed or depth bound reached; no work will be done
    Rejected,

    /// Waiting for, or holding, an admission gate slot
    Admitted,

    /// Network fetch in progress (holds a gate slot)
    Fetching,

    /// Extraction walk in progress (holds a gate slot)
    Parsing,

    /// Gate slot released; images, text and child tasks are being handed off
    DispatchingChildren,

    /// Terminal; the outstanding-work counter has been decremented
    Done,
}

impl TaskState {
    /// Returns true while the task holds an admission gate slot
    pub fn holds_gate_slot(&self) -> bool {
        matches!(self, Self::Fetching | Self::Parsing)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Pending, Claiming)
                | (Claiming, Rejected)
                | (Claiming, Admitted)
                | (Rejected, Done)
                | (Admitted, Fetching)
                | (Fetching, Parsing)
                | (Fetching, Done)
                | (Parsing, DispatchingChildren)
                | (Parsing, Done)
                | (DispatchingChildren, Done)
        )
    }

    /// Returns a short lowercase name for log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Claiming => "claiming",
            Self::Rejected => "rejected",
            Self::Admitted => "admitted",
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::DispatchingChildren => "dispatching_children",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a crawl task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOutcome {
    /// Page was fetched, extracted and handed off
    Processed,

    /// Another task had already claimed the address
    AlreadyClaimed,

    /// Task depth reached the recursion bound
    DepthExceeded,

    /// Transport failure or non-success status
    FetchFailed,

    /// Response body could not be treated as an HTML document
    ParseFailed,
}

impl TaskOutcome {
    /// Returns a short lowercase name for log and report output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::AlreadyClaimed => "already_claimed",
            Self::DepthExceeded => "depth_exceeded",
            Self::FetchFailed => "fetch_failed",
            Self::ParseFailed => "parse_failed",
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
