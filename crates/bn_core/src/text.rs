use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SENTENCE: Regex = Regex::new(r"[A-Z][^.!?]*[.!?]").unwrap();
}

/// Keeps only complete sentences: runs that start with an uppercase ASCII
/// letter and end in `.`, `?` or `!`, joined by single spaces.
///
/// Falls back to the input when nothing sentence-like is found.
pub fn trim_to_complete_sentences(text: &str) -> String {
    let sentences: Vec<&str> = SENTENCE.find_iter(text).map(|m| m.as_str()).collect();
    if sentences.is_empty() {
        text.to_string()
    } else {
        sentences.join(" ")
    }
}

/// Replaces double quotes with single quotes.
pub fn escape_quotes(text: &str) -> String {
    text.replace('"', "'")
}

/// Returns at most `max` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
