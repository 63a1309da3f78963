use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]+").expect("Invalid non-word regex"));

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host, it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_harvest::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Turns a domain into a label safe to use as a single folder name
///
/// Every run of non-word characters becomes one `_`.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::domain_label;
///
/// assert_eq!(domain_label("docs.example.com"), "docs_example_com");
/// ```
pub fn domain_label(domain: &str) -> String {
    NON_WORD.replace_all(domain, "_").into_owned()
}
