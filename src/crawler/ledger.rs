//! Visitation ledger
//!
//! The set of addresses already claimed for processing during one crawl run.
//! Entries are only ever added. A single `claim` call both checks and records,
//! so two tasks racing on the same address can never both win.

use dashmap::DashSet;

/// Concurrency-safe set of claimed addresses
#[derive(Debug, Default)]
pub struct Ledger {
    claimed: DashSet<String>,
}

impl Ledger {
    /// Creates an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims an address for processing
    ///
    /// # Returns
    ///
    /// * `true` - The address was unclaimed and now belongs to the caller
    /// * `false` - Some caller already claimed it; nothing changed
    pub fn claim(&self, address: &str) -> bool {
        if self.claimed.contains(address) {
            return false;
        }
        self.claimed.insert(address.to_string())
    }

    /// Returns true if the address has been claimed
    ///
    /// Advisory only: the answer may be stale by the time it is used.
    /// `claim` is the sole authority.
    pub fn contains(&self, address: &str) -> bool {
        self.claimed.contains(address)
    }

    /// Number of claimed addresses
    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    /// Returns true if nothing has been claimed yet
    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}
