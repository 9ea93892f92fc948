//! Utility functions and helpers.

pub mod http;

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Collapse whitespace runs (non-breaking spaces included) and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized text, or `None` when nothing is left.
pub fn non_empty(s: &str) -> Option<String> {
    let cleaned = normalize_whitespace(s);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Extract the organization symbol from a page link (`/orgs/SYMBOL`).
pub fn extract_org_symbol(link: &str) -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"/orgs/([A-Za-z0-9_-]+)").ok())
        .as_ref()?;

    pattern
        .captures(link)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_uppercase())
}
