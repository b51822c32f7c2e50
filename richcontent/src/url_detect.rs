use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// A URL is anchored after a non-identifier character (or line start) and
/// runs over printable ASCII.
#[allow(clippy::unwrap_used)]
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^a-zA-Z0-9\-_])(https?://[!-~]+)").unwrap());

/// Byte ranges of every URL in `input`, in order.
pub(crate) fn find_all_urls_index(input: &str) -> Vec<Range<usize>> {
    URL_RE
        .captures_iter(input)
        .filter_map(|caps| caps.get(1))
        .map(|m| {
            let end = trim_unbalanced_trailer(m.as_str());
            m.start()..m.start() + end
        })
        .collect()
}

/// The URL strings themselves; handy for tests and callers that do not need
/// positions.
pub fn find_all_urls(input: &str) -> Vec<&str> {
    find_all_urls_index(input)
        .into_iter()
        .map(|r| &input[r])
        .collect()
}

/// Matched-parens trim: when the candidate ends in a closing bracket but
/// still has unclosed openers, the trailing byte is prose punctuation, not
/// part of the URL. One level only; candidates whose brackets all close
/// (surplus closers included) are kept whole.
fn trim_unbalanced_trailer(s: &str) -> usize {
    if !matches!(s.as_bytes().last(), Some(b')' | b']' | b'}')) {
        return s.len();
    }
    let mut depth: i32 = 0;
    for b in s.bytes() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            _ => {}
        }
    }
    if depth > 0 { s.len() - 1 } else { s.len() }
}
