//! Source formatting
//!
//! Pure functions that turn raw search hits into text blocks for the
//! summarizer and the final sources listing.

use std::collections::HashSet;

use crate::state::SourceRecord;

/// Rough characters-per-token ratio used for truncation
const CHARS_PER_TOKEN: usize = 4;

/// One `"{i}. {title} - {url}"` line per source, numbered from 1
pub fn format_sources(sources: &[SourceRecord]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {} - {}", i + 1, s.title, s.url))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop sources with empty or repeated URLs, truncate long content, and
/// render `SOURCE {i}` blocks separated by blank lines.
pub fn deduplicate_and_format_sources(
    sources: &[SourceRecord],
    max_tokens_per_source: usize,
) -> String {
    let mut seen_urls = HashSet::new();
    let max_chars = max_tokens_per_source.saturating_mul(CHARS_PER_TOKEN);

    sources
        .iter()
        .filter(|s| !s.url.is_empty() && seen_urls.insert(s.url.as_str()))
        .enumerate()
        .map(|(i, s)| {
            format!(
                "SOURCE {}:\nTitle: {}\nURL: {}\nContent: {}\n",
                i + 1,
                s.title,
                s.url,
                truncate_content(&s.content, max_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn truncate_content(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

/// Split every block into lines and keep the first occurrence of each
/// non-blank line, preserving order.
pub fn dedup_source_lines<S: AsRef<str>>(blocks: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for line in blocks.iter().flat_map(|b| b.as_ref().split('\n')) {
        if !line.trim().is_empty() && seen.insert(line) {
            unique.push(line.to_string());
        }
    }

    unique
}
