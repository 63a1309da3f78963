//! Storage module for persisting harvested content
//!
//! This module handles everything written to disk:
//! - The per-seed destination folder (`<base-dir>/<domain_label>/`)
//! - Page text artifacts under `text/`
//! - Downloaded images under `img/`

mod destination;
mod sink;

pub use destination::prepare_destination;
pub use sink::{image_file_name, is_skipped_image, text_file_name, AssetSink};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid seed address '{0}'")]
    InvalidSeed(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
