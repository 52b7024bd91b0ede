use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

// Letters, digits, underscore, whitespace and basic punctuation survive.
// Not `\w`: in `regex` that also admits marks and join controls (U+FE0F, U+200D).
static DISALLOWED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\p{L}\p{N}_\s.,!?@#$%&*()\-']").expect("character filter pattern is valid")
});

/// Clean a review body for deduplication and display.
///
/// Trims, collapses whitespace runs to a single space and removes characters
/// outside the allow-list. Whitespace left adjacent by a removed character is
/// collapsed again, so the result is a fixed point:
/// `normalize_str(&normalize_str(s)) == normalize_str(s)`.
pub fn normalize_str(text: &str) -> String {
    let collapsed = collapse(text);
    let filtered = DISALLOWED.replace_all(&collapsed, "");
    collapse(&filtered)
}

/// Missing text normalizes to the empty string.
pub fn normalize(text: Option<&str>) -> String {
    text.map(normalize_str).unwrap_or_default()
}

fn collapse(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}
