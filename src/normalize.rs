//! Text normalization for cross-catalog search.
//!
//! Titles and artist strings coming from the source catalog carry
//! annotations ("(Live)", "[Remastered]", "feat. X") that the destination
//! search either lacks or ranks differently. Everything here is pure and
//! never fails.

use once_cell::sync::Lazy;
use regex::Regex;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Parenthesized annotations. Non-nested: the first ')' closes the span.
static PARENTHESIZED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());

/// Bracketed annotations. Non-nested: the first ']' closes the span.
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").unwrap());

/// Unbracketed featured-artist credit after some title text: "Song feat. Artist"
/// keeps "Song". A leading credit word is left to the noise-word filter.
static FEATURED_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)(\S)\s+(?:feat\.|ft\.|featuring)(?:\s.*)?$").unwrap());

/// Whole-word tokens dropped from titles and artist strings (case-insensitive).
pub const NOISE_WORDS: [&str; 7] = ["feat.", "ft.", "featuring", "with", "vs.", "vs", "&"];

/// Separators for splitting off the primary artist, in priority order.
pub const PRIMARY_ARTIST_SEPARATORS: [&str; 6] = [",", ";", "&", " and ", " x ", " X "];

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

pub fn is_noise_word(token: &str) -> bool {
    NOISE_WORDS.iter().any(|w| w.eq_ignore_ascii_case(token))
}

/// Normalize a title or artist string for searching.
///
/// Removes `( )` and `[ ]` spans, a trailing featured-artist credit and
/// noise words, then collapses whitespace. Case is preserved.
/// e.g., "Song (Live) [Remaster] feat. Bob" → "Song"
pub fn normalize(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let without_parens = PARENTHESIZED.replace_all(text, "");
    let without_brackets = BRACKETED.replace_all(&without_parens, "");
    let without_credit = FEATURED_TAIL.replace(&without_brackets, "$1");

    without_credit
        .split_whitespace()
        .filter(|token| !is_noise_word(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract the primary (first) artist from a multi-artist string.
/// The first separator present (in priority order) wins.
/// e.g., "A, B & C" → "A"
///       "Simon & Garfunkel" → "Simon"
///       "Solo" → "Solo"
pub fn extract_primary_artist(artist: &str) -> String {
    if artist.trim().is_empty() {
        return String::new();
    }

    PRIMARY_ARTIST_SEPARATORS
        .iter()
        .find_map(|sep| artist.split_once(sep))
        .map(|(head, _)| head.trim().to_string())
        .unwrap_or_else(|| artist.trim().to_string())
}

// ============================================================================
// TESTS
// ============================================================================
