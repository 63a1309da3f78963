//! Page processor: one walk over the parsed document
//!
//! A single depth-first pass collects, in document order:
//! - text from content-bearing elements
//! - image addresses from `<img src>`
//! - outbound link addresses from `<a href>`
//!
//! The walk uses an explicit stack, so deeply nested markup cannot overflow
//! the call stack.

use crate::url::{is_fetchable, normalize_with_scheme};
use crate::HarvestError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node};
use std::collections::HashSet;

/// Elements whose direct text children are harvested
pub const TEXT_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "a", "span",
];

static NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n+").expect("Invalid newline regex"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" +").expect("Invalid space regex"));

/// Everything discovered on one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Text fragments in document order, one per text-bearing element
    pub fragments: Vec<String>,

    /// Absolute image addresses, duplicates removed
    pub images: Vec<String>,

    /// Absolute link addresses in document order, duplicates removed
    pub links: Vec<String>,
}

impl ExtractionResult {
    /// The page text as it is persisted: one fragment per line, cleaned
    pub fn text(&self) -> String {
        clean_text(&self.fragments.join("\n"))
    }
}

/// Parses a fetched body and runs the extraction walk
///
/// A body whose `Content-Type` is present and is not HTML cannot be parsed as
/// a document and yields [`HarvestError::HtmlParse`].
pub fn parse_page(
    body: &str,
    content_type: Option<&str>,
    page_url: &str,
    default_scheme: &str,
) -> crate::Result<ExtractionResult> {
    if let Some(content_type) = content_type {
        if !is_html_content_type(content_type) {
            return Err(HarvestError::HtmlParse {
                url: page_url.to_string(),
                message: format!("Expected HTML, got {}", content_type),
            });
        }
    }

    let document = Html::parse_document(body);
    Ok(extract(&document, page_url, default_scheme))
}

/// Walks a parsed document and collects text, images and links
///
/// References are resolved against `page_url`. Malformed references and
/// references that do not resolve to an http(s) address are dropped.
pub fn extract(document: &Html, page_url: &str, default_scheme: &str) -> ExtractionResult {
    let mut result = ExtractionResult::default();
    let mut seen_images = HashSet::new();
    let mut seen_links = HashSet::new();

    let mut stack = vec![document.tree.root()];
    while let Some(node) = stack.pop() {
        if let Node::Element(element) = node.value() {
            let name = element.name();

            if name == "img" {
                if let Some(address) = element
                    .attr("src")
                    .and_then(|src| resolve(src, page_url, default_scheme))
                {
                    if seen_images.insert(address.clone()) {
                        result.images.push(address);
                    }
                }
            } else if TEXT_TAGS.contains(&name) {
                let fragment = node
                    .children()
                    .filter_map(|child| child.value().as_text())
                    .map(|text| &**text)
                    .collect::<Vec<&str>>()
                    .join(" ");
                if !fragment.trim().is_empty() {
                    result.fragments.push(fragment);
                }
            }

            if name == "a" {
                if let Some(address) = element
                    .attr("href")
                    .and_then(|href| resolve(href, page_url, default_scheme))
                {
                    if seen_links.insert(address.clone()) {
                        result.links.push(address);
                    }
                }
            }
        }

        // Reversed so the first child is popped next, keeping document order
        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev());
    }

    result
}

/// Collapses whitespace in harvested text
///
/// Trims the ends, collapses runs of newlines to one newline and runs of
/// spaces to one space. Applying it twice changes nothing.
///
/// # Examples
///
/// ```
/// use sumi_harvest::crawler::clean_text;
///
/// assert_eq!(clean_text("  a\n\n\nb   c  "), "a\nb c");
/// ```
pub fn clean_text(input: &str) -> String {
    let trimmed = input.trim();
    let collapsed = NEWLINES.replace_all(trimmed, "\n");
    SPACES.replace_all(&collapsed, " ").into_owned()
}

fn resolve(reference: &str, page_url: &str, default_scheme: &str) -> Option<String> {
    let reference = reference.trim();

    // Empty and fragment-only references point back at the page itself
    if reference.is_empty() || reference.starts_with('#') {
        return None;
    }

    match normalize_with_scheme(page_url, reference, default_scheme) {
        Ok(address) if is_fetchable(&address) => Some(address),
        Ok(address) => {
            tracing::trace!("Dropping non-http reference {}", address);
            None
        }
        Err(e) => {
            tracing::debug!("Dropping reference on {}: {}", page_url, e);
            None
        }
    }
}

fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}
