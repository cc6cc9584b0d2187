//! Cleanup for bodies delivered by the proof-attesting fetch path.
//!
//! That transport hands back the raw HTTP body as one string, sometimes with
//! the chunked transfer-encoding framing still inside it and a run of `*`
//! padding at the end. Plain bodies pass through untouched.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex_lite::Regex;

static LEADING_SIZE_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*[0-9a-fA-F]+\r\n").ok());
static TERMINAL_CHUNK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\r\n)?0\r\n\r\n\s*$").ok());
static INTERIOR_SIZE_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\r\n[0-9a-fA-F]+\r\n").ok());
static TRAILING_ASTERISKS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\*+\s*$").ok());

fn is_match(re: &LazyLock<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

fn strip<'a>(re: &LazyLock<Option<Regex>>, text: &'a str) -> Cow<'a, str> {
    match re.as_ref() {
        Some(re) => re.replace_all(text, ""),
        None => Cow::Borrowed(text),
    }
}

/// Strip chunked-transfer artifacts from a buffered body.
///
/// Interior size markers are only removed when the body carries a leading
/// size line or the terminal zero-length chunk, so CRLF whitespace inside a
/// clean payload is never rewritten.
#[must_use]
pub fn clean_chunk_artifacts(text: &str) -> Cow<'_, str> {
    let trimmed = strip(&TRAILING_ASTERISKS, text);
    let chunked = is_match(&LEADING_SIZE_LINE, &trimmed) || is_match(&TERMINAL_CHUNK, &trimmed);
    if !chunked {
        return trimmed;
    }

    let body = strip(&LEADING_SIZE_LINE, &trimmed).into_owned();
    let body = strip(&TERMINAL_CHUNK, &body).into_owned();
    let body = strip(&INTERIOR_SIZE_LINE, &body).into_owned();
    Cow::Owned(body)
}
