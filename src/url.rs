//! URL extraction from pasted or typed text.

use std::sync::LazyLock;

use regex::Regex;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>]+"#).expect("valid regex"));

/// Trailing punctuation that is almost never part of a pasted URL.
const TRAILING: &[char] = &['.', ',', ';', ')', ']', '}'];

/// Picks the URL to fetch out of raw input.
///
/// Returns the first `http(s)://` URL found anywhere in the text. Without
/// one, a single whitespace-free token is returned as is so the backend can
/// decide (e.g. `youtu.be/abc`). Anything else yields `None`.
#[must_use]
pub fn extract_url(input: &str) -> Option<String> {
    if let Some(m) = URL_RE.find(input) {
        return Some(m.as_str().trim_end_matches(TRAILING).to_string());
    }

    let trimmed = input.trim();
    let mut tokens = trimmed.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(token), None) => Some(token.to_string()),
        _ => None,
    }
}
