//! # Scoring & Indexing Module
//!
//! ## Purpose
//! Pure functions over catalog items: a popularity score computed from
//! engagement counters, and normalized search keywords derived from an
//! item's name, summary, categories, and authors.
//!
//! ## Input/Output Specification
//! - **Input**: A [`CatalogItem`] snapshot
//! - **Output**: A bounded popularity score in `[0, 1]`, or a deduplicated
//!   set of lowercase keyword tokens
//! - **Determinism**: No clocks, no I/O, no randomness — identical inputs
//!   always produce identical outputs
//!
//! The keyword set is only a fallback substring matcher for the cached-scan
//! strategy when structured querying is unavailable, not a ranking engine.

use crate::CatalogItem;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

/// Weight of log-normalized downloads in the popularity score
const DOWNLOAD_WEIGHT: f64 = 0.6;
/// Weight of log-normalized thumbs-up count
const THUMBS_UP_WEIGHT: f64 = 0.3;
/// Flat bonus weight applied when the catalog marks the item featured
const FEATURED_WEIGHT: f64 = 0.1;

/// Counts at or above 10^LOG_CEILING saturate their normalized component.
/// Download counts span many orders of magnitude; log10 compresses them to
/// a comparable range and the ceiling keeps the score bounded.
const LOG_CEILING: f64 = 9.0;

/// Tokens shorter than this never become keywords
const MIN_TOKEN_LENGTH: usize = 3;

/// Fixed stop-word list for keyword extraction
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "this", "that", "mod", "mods", "your", "you", "are", "all",
    "from", "will", "can", "has", "have", "not", "its", "into", "more", "new", "use",
];

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[a-z0-9]+").expect("valid token pattern"))
}

/// Normalize a raw count onto `[0, 1]` with log10 compression
fn log_normalize(count: u64) -> f64 {
    let compressed = (count as f64 + 1.0).log10();
    (compressed / LOG_CEILING).min(1.0)
}

/// Popularity score in `[0, 1]`, monotonically non-decreasing in downloads,
/// thumbs-up count, and the featured flag independently.
pub fn popularity_score(item: &CatalogItem) -> f64 {
    let downloads = log_normalize(item.download_count);
    let thumbs_up = log_normalize(item.thumbs_up_count);
    let featured = if item.featured { 1.0 } else { 0.0 };

    DOWNLOAD_WEIGHT * downloads + THUMBS_UP_WEIGHT * thumbs_up + FEATURED_WEIGHT * featured
}

/// Tokenize one text fragment into normalized keyword candidates
fn tokenize_into(text: &str, out: &mut BTreeSet<String>) {
    let normalized: String = text.nfkc().collect::<String>().to_lowercase();
    for token in token_pattern().find_iter(&normalized) {
        let token = token.as_str();
        if token.len() < MIN_TOKEN_LENGTH {
            continue;
        }
        if STOP_WORDS.contains(&token) {
            continue;
        }
        out.insert(token.to_string());
    }
}

/// Deduplicated lowercase keyword set for an item, drawn from its name,
/// summary, category labels, and author names.
pub fn search_keywords(item: &CatalogItem) -> BTreeSet<String> {
    let mut keywords = BTreeSet::new();
    tokenize_into(&item.name, &mut keywords);
    tokenize_into(&item.summary, &mut keywords);
    for category in &item.categories {
        tokenize_into(category, &mut keywords);
    }
    for author in &item.authors {
        tokenize_into(author, &mut keywords);
    }
    keywords
}

/// Whether an item matches a free-text query through its keyword set.
/// Containment check in both directions so "dino" matches "dinosaurs".
pub fn keywords_match(item: &CatalogItem, query: &str) -> bool {
    let mut query_tokens = BTreeSet::new();
    tokenize_into(query, &mut query_tokens);
    if query_tokens.is_empty() {
        return false;
    }

    let keywords = search_keywords(item);
    query_tokens.iter().all(|token| {
        keywords
            .iter()
            .any(|kw| kw.contains(token.as_str()) || token.contains(kw.as_str()))
    })
}

/// First query token that survives normalization; used by the broadened
/// fetch strategy to retry with a less specific query.
pub fn primary_keyword(query: &str) -> Option<String> {
    let normalized: String = query.nfkc().collect::<String>().to_lowercase();
    token_pattern()
        .find_iter(&normalized)
        .map(|m| m.as_str())
        .find(|t| t.len() >= MIN_TOKEN_LENGTH && !STOP_WORDS.contains(t))
        .map(|t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(downloads: u64, thumbs_up: u64, featured: bool) -> CatalogItem {
        CatalogItem {
            id: 1,
            name: "Dino Tracker".to_string(),
            summary: "Track tamed dinosaurs across the map".to_string(),
            download_count: downloads,
            thumbs_up_count: thumbs_up,
            featured,
            categories: vec!["Utility".to_string()],
            authors: vec!["survivalist".to_string()],
            date_modified: Utc::now(),
        }
    }

    #[test]
    fn score_is_monotonic_in_downloads() {
        let low = popularity_score(&item(100, 10, false));
        let high = popularity_score(&item(100_000, 10, false));
        assert!(high > low);
    }

    #[test]
    fn score_is_monotonic_in_thumbs_up() {
        let low = popularity_score(&item(100, 10, false));
        let high = popularity_score(&item(100, 10_000, false));
        assert!(high > low);
    }

    #[test]
    fn featured_flag_adds_flat_bonus() {
        let plain = popularity_score(&item(100, 10, false));
        let featured = popularity_score(&item(100, 10, true));
        assert!((featured - plain - FEATURED_WEIGHT).abs() < 1e-9);
    }

    #[test]
    fn score_is_bounded() {
        let extreme = popularity_score(&item(u64::MAX, u64::MAX, true));
        assert!(extreme <= 1.0);
        assert!(popularity_score(&item(0, 0, false)) >= 0.0);
    }

    #[test]
    fn keywords_drop_stop_words_and_short_tokens() {
        let keywords = search_keywords(&item(0, 0, false));
        assert!(keywords.contains("dino"));
        assert!(keywords.contains("tracker"));
        assert!(keywords.contains("utility"));
        assert!(keywords.contains("survivalist"));
        assert!(keywords.contains("map")); // exactly the minimum length
        assert!(!keywords.contains("the"));

        let mut short = item(0, 0, false);
        short.summary = "an io x9 tool".to_string();
        let keywords = search_keywords(&short);
        assert!(!keywords.contains("an"));
        assert!(!keywords.contains("io"));
        assert!(!keywords.contains("x9"));
        assert!(keywords.contains("tool"));
    }

    #[test]
    fn keywords_are_lowercase_and_deduplicated() {
        let mut it = item(0, 0, false);
        it.summary = "DINO dino Dino".to_string();
        let keywords = search_keywords(&it);
        assert_eq!(keywords.iter().filter(|k| k.as_str() == "dino").count(), 1);
    }

    #[test]
    fn keyword_match_handles_partial_tokens() {
        let mut it = item(0, 0, false);
        it.summary = "All about dinosaurs".to_string();
        assert!(keywords_match(&it, "dino"));
        assert!(!keywords_match(&it, "spaceship"));
        assert!(!keywords_match(&it, ""));
    }

    #[test]
    fn primary_keyword_skips_stop_words() {
        assert_eq!(primary_keyword("the dino mods"), Some("dino".to_string()));
        assert_eq!(primary_keyword("the and"), None);
    }
}
