//! Link extraction.
//!
//! Finds every `http://` or `https://` run of non-whitespace characters in a
//! message, in the order they appear.

use lazy_regex::lazy_regex;

static RE_LINK: lazy_regex::Lazy<lazy_regex::Regex> = lazy_regex!(r"https?://\S+");

/// Extract all URL-shaped substrings from `text`.
///
/// Duplicates are kept; nothing is validated beyond the pattern itself.
///
/// # Examples
///
/// ```
/// use linkrelay_core::links::extract_links;
///
/// let links = extract_links("see https://youtu.be/abc and http://example.com/x");
/// assert_eq!(links, vec!["https://youtu.be/abc", "http://example.com/x"]);
/// ```
#[must_use]
pub fn extract_links(text: &str) -> Vec<&str> {
    RE_LINK.find_iter(text).map(|m| m.as_str()).collect()
}
