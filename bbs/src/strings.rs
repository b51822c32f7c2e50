//! Line-format conventions of BBS articles: meta headers, quote and
//! signature prefixes, push-line tags, and filename validation.

use std::sync::LazyLock;

use chrono::DateTime;
use chrono::Utc;
use regex::Regex;

use crate::Error;
use crate::Result;

pub const ARTICLE_AUTHOR: &str = "作者";
pub const ARTICLE_TITLE: &str = "標題";

/// Prefixes of quoted lines in replies.
pub const QUOTE_PREFIX_STRINGS: &[&str] = &[": ", "> "];
/// Prefixes of signature blocks.
pub const SIGNATURE_PREFIX_STRINGS: &[&str] = &["※", "==>"];
/// First segment of a push (comment) line: push, boo, neutral arrow.
pub const PUSH_PREFIX_STRINGS: &[&str] = &["推 ", "噓 ", "→ "];

const SUBJECT_PREFIX_STRINGS: &[&str] = &["re:", "fw:", "[轉錄]"];

#[allow(clippy::unwrap_used)]
static ARTICLE_FIRST_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?): (.+) (.+?): (.+?)\n$").unwrap());
#[allow(clippy::unwrap_used)]
static ARTICLE_META_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?): (.+)\n$").unwrap());
#[allow(clippy::unwrap_used)]
static VALID_BRD_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-zA-Z][0-9a-zA-Z_.\-]+$").unwrap());
#[allow(clippy::unwrap_used)]
static VALID_FILE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[MG]\.\d+\.A(\.[0-9A-F]+)?$").unwrap());
#[allow(clippy::unwrap_used)]
static VALID_USER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][0-9a-zA-Z]{1,11}$").unwrap());
#[allow(clippy::unwrap_used)]
static FILE_NAME_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[MG]\.(\d+)\.A(\.[0-9A-F]+)?$").unwrap());

pub fn is_valid_brd_name(brdname: &str) -> bool {
    VALID_BRD_NAME_RE.is_match(brdname)
}

pub fn is_valid_article_file_name(filename: &str) -> bool {
    VALID_FILE_NAME_RE.is_match(filename)
}

pub fn is_valid_user_id(user_id: &str) -> bool {
    VALID_USER_ID_RE.is_match(user_id)
}

/// Matches the two-column first line of an article header,
/// `tag1: val1 tag2: val2`. The line must end with a newline.
pub fn parse_article_first_line(line: &str) -> Option<(&str, &str, &str, &str)> {
    let m = ARTICLE_FIRST_LINE_RE.captures(line)?;
    match (m.get(1), m.get(2), m.get(3), m.get(4)) {
        (Some(tag1), Some(val1), Some(tag2), Some(val2)) => Some((
            tag1.as_str(),
            val1.as_str(),
            tag2.as_str(),
            val2.as_str(),
        )),
        _ => None,
    }
}

/// Matches a single `tag: value` article header line.
pub fn parse_article_meta_line(line: &str) -> Option<(&str, &str)> {
    let m = ARTICLE_META_LINE_RE.captures(line)?;
    match (m.get(1), m.get(2)) {
        (Some(tag), Some(val)) => Some((tag.as_str(), val.as_str())),
        _ => None,
    }
}

pub fn match_prefix(line: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| line.starts_with(p))
}

/// The posting time encoded in an article filename.
pub fn parse_file_name_time(filename: &str) -> Result<DateTime<Utc>> {
    let unix: i64 = FILE_NAME_TIME_RE
        .captures(filename)
        .and_then(|m| m.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or(Error::InvalidFileName)?;
    DateTime::from_timestamp(unix, 0).ok_or(Error::InvalidFileName)
}

/// Strips the reply/forward prefixes (`Re:`, `Fw:`, `[轉錄]`) that pile up
/// at the front of subjects, along with the spaces between them.
pub fn normalize_subject(subject: &str) -> &str {
    let mut off = 0;
    for p in SUBJECT_PREFIX_STRINGS {
        while has_prefix_ignore_ascii_case(&subject[off..], p) {
            off += p.len();
            off += count_prefix_spaces(&subject[off..]);
        }
        off += count_prefix_spaces(&subject[off..]);
    }
    &subject[off..]
}

fn has_prefix_ignore_ascii_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn count_prefix_spaces(s: &str) -> usize {
    s.bytes().take_while(|&b| b == b' ').count()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn first_line_splits_into_two_columns() {
        let (tag1, val1, tag2, val2) =
            parse_article_first_line("作者: user (nick) 看板: test\n").unwrap();
        assert_eq!(tag1, "作者");
        assert_eq!(val1, "user (nick)");
        assert_eq!(tag2, "看板");
        assert_eq!(val2, "test");
    }

    #[test]
    fn meta_line_splits_tag_and_value() {
        let (tag, val) = parse_article_meta_line("標題: [問題] 安安\n").unwrap();
        assert_eq!(tag, "標題");
        assert_eq!(val, "[問題] 安安");

        assert_eq!(parse_article_meta_line("no colon here\n"), None);
        assert_eq!(parse_article_meta_line("標題: 無換行"), None);
    }

    #[test]
    fn validators() {
        assert!(is_valid_brd_name("Gossiping"));
        assert!(is_valid_brd_name("C_Chat"));
        assert!(!is_valid_brd_name("_x"));
        assert!(!is_valid_brd_name("a"));

        assert!(is_valid_article_file_name("M.1365119687.A.F72"));
        assert!(is_valid_article_file_name("G.1128765309.A"));
        assert!(!is_valid_article_file_name("M.abc.A.F72"));

        assert!(is_valid_user_id("somebody"));
        assert!(!is_valid_user_id("0day"));
    }

    #[test]
    fn file_name_time() {
        let t = parse_file_name_time("M.1365119687.A.F72").unwrap();
        assert_eq!(t.timestamp(), 1365119687);
        assert!(parse_file_name_time("junk").is_err());
    }

    #[test]
    fn subject_prefixes_are_stripped() {
        assert_eq!(normalize_subject("Re: Re:  Fw: hello"), "hello");
        // Prefix kinds strip in one fixed pass; a Re: after [轉錄] stays.
        assert_eq!(normalize_subject("[轉錄] Re: hi"), "Re: hi");
        assert_eq!(normalize_subject("plain"), "plain");
    }
}
