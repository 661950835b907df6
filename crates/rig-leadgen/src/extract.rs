//! Profile reference extraction
//!
//! Finds professional-network profile URLs in arbitrary text. Matches are
//! returned in order of appearance and are not deduplicated.

use regex::Regex;
use std::sync::OnceLock;

/// Scheme, optional subdomain, fixed `/in/` path and an identifier made of
/// ASCII alphanumerics, hyphens and underscores.
pub const PROFILE_URL_PATTERN: &str = r"https?://(?:[a-zA-Z0-9-]+\.)?linkedin\.com/in/[a-zA-Z0-9_-]+";

/// Identifier used when a payload carries no usable URL
pub const UNKNOWN_REFERENCE: &str = "unknown";

fn profile_url_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(PROFILE_URL_PATTERN).expect("PROFILE_URL_PATTERN is a valid regex")
    })
}

/// Extract every profile URL in `text`, in order of appearance
pub fn extract_profile_urls(text: &str) -> Vec<String> {
    profile_url_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Reference identifier of a profile URL: its trailing path segment
pub fn reference_id(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Identifier for an inbound enrichment payload's `url` field.
///
/// Missing, non-string or empty-segment URLs map to `"unknown"`.
pub fn payload_reference_id(url: Option<&str>) -> &str {
    match url.map(reference_id) {
        Some(id) if !id.is_empty() => id,
        _ => UNKNOWN_REFERENCE,
    }
}
