use crate::{UrlError, UrlResult};
use url::{ParseError, Url};

/// Scheme given to scheme-relative references when none is configured
pub const DEFAULT_SCHEME: &str = "https";

/// Resolves a possibly-relative reference against a base address
///
/// # Resolution Rules
///
/// 1. A scheme-relative reference (`//host/path`) gets the default scheme
/// 2. A reference that already parses as an absolute URL is returned unchanged
/// 3. Anything else is resolved against `base` with standard relative resolution
///
/// No canonicalization happens: two references that resolve to textually
/// different absolute forms are different addresses.
///
/// # Arguments
///
/// * `base` - The address of the page the reference was found on
/// * `reference` - The raw attribute value
///
/// # Returns
///
/// * `Ok(String)` - The absolute address
/// * `Err(UrlError::MalformedReference)` - `base` or `reference` cannot be parsed
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::normalize;
///
/// assert_eq!(
///     normalize("https://example.com/docs/", "intro").unwrap(),
///     "https://example.com/docs/intro"
/// );
/// assert_eq!(
///     normalize("https://example.com/", "//cdn.example.com/a.png").unwrap(),
///     "https://cdn.example.com/a.png"
/// );
/// ```
pub fn normalize(base: &str, reference: &str) -> UrlResult<String> {
    normalize_with_scheme(base, reference, DEFAULT_SCHEME)
}

/// Same as [`normalize`], with an explicit scheme for scheme-relative references
pub fn normalize_with_scheme(
    base: &str,
    reference: &str,
    default_scheme: &str,
) -> UrlResult<String> {
    let reference = reference.trim();

    // Rule 1: scheme-relative
    if reference.starts_with("//") {
        let absolute = format!("{}:{}", default_scheme, reference);
        Url::parse(&absolute).map_err(|e| malformed(reference, e))?;
        return Ok(absolute);
    }

    // Rule 2: already absolute
    match Url::parse(reference) {
        Ok(_) => return Ok(reference.to_string()),
        Err(ParseError::RelativeUrlWithoutBase) => {}
        Err(e) => return Err(malformed(reference, e)),
    }

    // Rule 3: relative resolution
    let base_url = Url::parse(base).map_err(|e| malformed(base, e))?;
    let resolved = base_url.join(reference).map_err(|e| malformed(reference, e))?;

    Ok(resolved.to_string())
}

fn malformed(reference: &str, err: ParseError) -> UrlError {
    UrlError::MalformedReference {
        reference: reference.to_string(),
        reason: err.to_string(),
    }
}
