//! # Text Processing Module
//!
//! Text normalization and tokenization utilities shared by the product and
//! FAQ matchers.
//!
//! ## Features
//!
//! - Accent/case-insensitive normalization (lower-case, canonical
//!   decomposition, combining-mark removal) so "Jabón" and "jabon" compare equal
//! - Whitespace tokenization with a Spanish stop-word filter
//! - Keyword-overlap scoring for FAQ lookup

use lazy_static::lazy_static;
use log::trace;
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// Stored already normalized (lower-case, accents stripped) so they can be
// compared against normalized tokens directly.
const STOP_WORD_LIST: &[&str] = &[
    "a", "al", "algo", "como", "con", "cual", "cuales", "cuando", "cuanto", "de", "del", "donde",
    "el", "ella", "ellos", "en", "es", "esa", "ese", "esta", "este", "esto", "hace", "hacen",
    "hay", "la", "las", "le", "les", "lo", "los", "me", "mi", "mis", "muy", "no", "nos", "o",
    "para", "pero", "por", "puede", "puedo", "que", "se", "ser", "si", "sin", "son", "su", "sus",
    "te", "tiene", "tienen", "tu", "tus", "u", "un", "una", "unas", "unos", "ustedes", "y", "ya",
    "yo",
];

lazy_static! {
    static ref STOP_WORDS: HashSet<&'static str> = STOP_WORD_LIST.iter().copied().collect();
}

/// Normalize text for matching: lower-case, then strip diacritics via
/// canonical decomposition followed by combining-mark removal.
///
/// # Examples
///
/// ```rust
/// use pedidos_bot::text_processing::normalize;
///
/// assert_eq!(normalize("Jabón Azul"), "jabon azul");
/// ```
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

fn trim_punctuation(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Tokenize a user query for FAQ matching: normalized whitespace tokens with
/// surrounding punctuation trimmed, stop words and tokens of length <= 2
/// removed.
pub fn query_tokens(text: &str) -> Vec<String> {
    let tokens: Vec<String> = normalize(text)
        .split_whitespace()
        .map(trim_punctuation)
        .filter(|t| t.chars().count() > 2 && !STOP_WORDS.contains(t))
        .map(|t| t.to_string())
        .collect();

    trace!("query tokenized into {} content tokens", tokens.len());
    tokens
}

/// Tokenize a stored FAQ question: normalized whitespace tokens with stop
/// words removed. Short tokens are kept here; the length filter applies to
/// the user's query only.
pub fn question_tokens(text: &str) -> HashSet<String> {
    normalize(text)
        .split_whitespace()
        .map(trim_punctuation)
        .filter(|t| !t.is_empty() && !STOP_WORDS.contains(t))
        .map(|t| t.to_string())
        .collect()
}

/// Count how many query tokens appear in a question's token set.
pub fn overlap_score(query: &[String], question: &HashSet<String>) -> usize {
    query.iter().filter(|t| question.contains(t.as_str())).count()
}
