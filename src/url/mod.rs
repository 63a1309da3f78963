//! URL handling module for Sumi-Harvest
//!
//! This module provides reference resolution (the single authority on what
//! counts as "the same address" for the visitation ledger) and the domain
//! helpers used to name the destination folder.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{domain_label, extract_domain};
pub use normalize::{normalize, normalize_with_scheme, DEFAULT_SCHEME};

/// Returns true if the address uses a scheme the fetcher can retrieve
pub fn is_fetchable(address: &str) -> bool {
    ::url::Url::parse(address)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}
