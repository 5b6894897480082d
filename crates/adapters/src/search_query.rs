//! Turns the verbose illustration prompts used by the pipeline into short
//! keyword queries for the photo-search service.

use once_cell::sync::Lazy;
use std::collections::HashSet;

const MAX_QUERY_TERMS: usize = 5;
const MIN_TERM_LENGTH: usize = 3;
const DEFAULT_QUERY: &str = "professional business";

/// Template boilerplate stripped before keyword extraction. Order matters:
/// `"create a"` is a prefix of `"create a professional"`, so the longer
/// phrase must be removed first.
const BOILERPLATE_PHRASES: &[&str] = &[
    "create a professional",
    "create a",
    "style: modern, clean, professional",
    "no text in image",
    "high quality and visually appealing",
    "suitable for a serious book",
    "clean design with space for title and author name",
];

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does",
        "did", "will", "would", "could", "should", "may", "might", "must", "can", "this", "that",
        "these", "those", "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us",
        "them", "my", "your", "his", "its", "our", "their", "mine", "yours", "hers", "ours",
        "theirs",
    ]
    .into_iter()
    .collect()
});

/// Pure and total: the same prompt always yields the same query, and the
/// result is never empty.
pub fn to_search_query(prompt: &str) -> String {
    let mut text = prompt.to_lowercase();
    for phrase in BOILERPLATE_PHRASES {
        text = text.replace(phrase, "");
    }

    let terms: Vec<&str> = text
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(word) && word.chars().count() >= MIN_TERM_LENGTH)
        .take(MAX_QUERY_TERMS)
        .collect();

    if terms.is_empty() {
        DEFAULT_QUERY.to_string()
    } else {
        terms.join(" ")
    }
}
