//! Asset sink: writes page text and image bytes under the destination folder
//!
//! Every write targets a distinct path by construction: text artifacts are
//! keyed by depth and a hash of the page address, images by file name.

use crate::storage::{StorageError, StorageResult};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

const TEXT_DIR: &str = "text";
const IMAGE_DIR: &str = "img";
const FALLBACK_IMAGE_NAME: &str = "image";

/// Hex characters of the address hash kept in text file names
const HASH_PREFIX_LEN: usize = 12;

static UNSAFE_FILE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.]").expect("Invalid file name regex"));

/// Filesystem writer rooted at one destination folder
#[derive(Debug, Clone)]
pub struct AssetSink {
    root: PathBuf,
    text_dir: PathBuf,
    image_dir: PathBuf,
}

impl AssetSink {
    /// Creates the `text/` and `img/` folders under `root`
    pub fn create(root: PathBuf) -> StorageResult<Self> {
        let text_dir = root.join(TEXT_DIR);
        let image_dir = root.join(IMAGE_DIR);

        for dir in [&text_dir, &image_dir] {
            std::fs::create_dir_all(dir).map_err(|source| StorageError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }

        Ok(Self {
            root,
            text_dir,
            image_dir,
        })
    }

    /// The destination folder this sink writes under
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the text artifact for a page ends up
    pub fn text_path(&self, depth: u32, page_url: &str) -> PathBuf {
        self.text_dir.join(text_file_name(depth, page_url))
    }

    /// Where an image ends up
    pub fn image_path(&self, image_url: &str) -> PathBuf {
        self.image_dir.join(image_file_name(image_url))
    }

    /// Writes the cleaned text of one page
    pub async fn write_text(
        &self,
        depth: u32,
        page_url: &str,
        content: &str,
    ) -> StorageResult<PathBuf> {
        let path = self.text_path(depth, page_url);
        write_file(&path, content.as_bytes()).await?;
        Ok(path)
    }

    /// Writes downloaded image bytes
    pub async fn write_image(&self, image_url: &str, bytes: &[u8]) -> StorageResult<PathBuf> {
        let path = self.image_path(image_url);
        write_file(&path, bytes).await?;
        Ok(path)
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Returns true for images that are never downloaded (SVG)
///
/// # Examples
///
/// ```
/// use sumi_harvest::storage::is_skipped_image;
///
/// assert!(is_skipped_image("https://example.com/logo.svg"));
/// assert!(!is_skipped_image("https://example.com/logo.png"));
/// ```
pub fn is_skipped_image(image_url: &str) -> bool {
    url_path(image_url).to_ascii_lowercase().ends_with(".svg")
}

/// File name for a downloaded image
///
/// Last path segment of the address with the query ignored; characters
/// outside `[A-Za-z0-9_.]` become `_`.
pub fn image_file_name(image_url: &str) -> String {
    let path = url_path(image_url);
    let last = path.rsplit('/').next().unwrap_or("");
    let name = UNSAFE_FILE_CHARS.replace_all(last, "_").into_owned();

    if name.chars().all(|c| c == '.') {
        FALLBACK_IMAGE_NAME.to_string()
    } else {
        name
    }
}

/// File name for a page's text artifact: `page_<depth>_<hash>.txt`
pub fn text_file_name(depth: u32, page_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(page_url.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("page_{}_{}.txt", depth, &digest[..HASH_PREFIX_LEN])
}

fn url_path(address: &str) -> String {
    match Url::parse(address) {
        Ok(url) => url.path().to_string(),
        Err(_) => address
            .split(['?', '#'])
            .next()
            .unwrap_or("")
            .to_string(),
    }
}
