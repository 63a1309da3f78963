use crate::storage::{StorageError, StorageResult};
use crate::url::{domain_label, extract_domain};
use std::path::{Path, PathBuf};
use url::Url;

/// Creates the destination folder for a crawl seeded at `seed`
///
/// The folder is `<base_dir>/<label>` where the label is the seed's host with
/// every run of non-word characters replaced by `_`. It is created if absent.
/// Failure here is the only fatal error of a crawl run.
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::storage::prepare_destination;
/// use std::path::Path;
///
/// let folder = prepare_destination(Path::new("data"), "https://www.example.com/").unwrap();
/// assert!(folder.ends_with("www_example_com"));
/// ```
pub fn prepare_destination(base_dir: &Path, seed: &str) -> StorageResult<PathBuf> {
    let url = Url::parse(seed.trim()).map_err(|_| StorageError::InvalidSeed(seed.to_string()))?;
    let domain = extract_domain(&url).ok_or_else(|| StorageError::InvalidSeed(seed.to_string()))?;

    let folder = base_dir.join(domain_label(&domain));
    std::fs::create_dir_all(&folder).map_err(|source| StorageError::CreateDir {
        path: folder.clone(),
        source,
    })?;

    Ok(folder)
}
