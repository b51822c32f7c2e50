use crate::terminal::DEFAULT_BG;
use crate::terminal::DEFAULT_FG;
use crate::terminal::TerminalState;

pub(crate) const CLASS_FG_PREFIX: &str = "f";
pub(crate) const CLASS_BG_PREFIX: &str = "b";
pub(crate) const CLASS_HIGHLIGHT: &str = "hl";
pub(crate) const CLASS_PUSH_DIV: &str = "push";

pub(crate) const CLASS_ARTICLE_META_LINE: &str = "article-metaline";
pub(crate) const CLASS_ARTICLE_META_LINE_RIGHT: &str = "article-metaline-right";
pub(crate) const CLASS_ARTICLE_META_TAG: &str = "article-meta-tag";
pub(crate) const CLASS_ARTICLE_META_VALUE: &str = "article-meta-value";

/// Semantic tags attached to the segments of a recognized push line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ExtraFlags(u8);

impl ExtraFlags {
    pub(crate) const PUSH_TAG: Self = Self(1 << 0);
    pub(crate) const PUSH_USER_ID: Self = Self(1 << 1);
    pub(crate) const PUSH_CONTENT: Self = Self(1 << 2);
    pub(crate) const PUSH_IP_DATETIME: Self = Self(1 << 3);

    pub(crate) fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A run of output characters sharing one terminal state. The buffer holds
/// the HTML-escaped inner text; open/close tags derive from the state.
#[derive(Debug, Clone, Default)]
pub(crate) struct Segment {
    buffer: String,
    pub(crate) term_state: TerminalState,
    pub(crate) extra_flags: ExtraFlags,
}

impl Segment {
    pub(crate) fn new(term_state: TerminalState) -> Self {
        Self {
            buffer: String::new(),
            term_state,
            extra_flags: ExtraFlags::default(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.buffer.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub(crate) fn inner(&self) -> &str {
        &self.buffer
    }

    /// `inner()[from..to]` with both ends clamped to the buffer.
    pub(crate) fn inner_slice(&self, from: usize, to: usize) -> &str {
        let to = to.min(self.buffer.len());
        let from = from.min(to);
        &self.buffer[from..to]
    }

    /// Appends one character, HTML-escaped. Characters at or above 256 pass
    /// through verbatim; the replacement character is dropped.
    pub(crate) fn write_escaped_char(&mut self, ch: char) {
        write_html_escaped_char(&mut self.buffer, ch);
    }

    pub(crate) fn trim_right_spaces(&mut self) {
        self.buffer.truncate(self.buffer.trim_end_matches(' ').len());
    }

    fn classes(&self) -> Vec<String> {
        let mut classes = Vec::with_capacity(3);
        if self.term_state.fg() != DEFAULT_FG {
            classes.push(format!("{CLASS_FG_PREFIX}{}", self.term_state.fg()));
        }
        if self.term_state.bg() != DEFAULT_BG {
            classes.push(format!("{CLASS_BG_PREFIX}{}", self.term_state.bg()));
        }
        if self.term_state.highlighted() {
            classes.push(CLASS_HIGHLIGHT.to_owned());
        }
        for (flag, class) in [
            (ExtraFlags::PUSH_TAG, "push-tag"),
            (ExtraFlags::PUSH_USER_ID, "push-userid"),
            (ExtraFlags::PUSH_CONTENT, "push-content"),
            (ExtraFlags::PUSH_IP_DATETIME, "push-ipdatetime"),
        ] {
            if self.extra_flags.contains(flag) {
                classes.push(class.to_owned());
            }
        }
        classes
    }

    /// Writes the opening tag, or nothing for an unadorned segment.
    pub(crate) fn write_open(&self, out: &mut String) {
        let classes = self.classes();
        if classes.is_empty() {
            return;
        }
        out.push_str("<span class=\"");
        out.push_str(&classes.join(" "));
        out.push_str("\">");
    }

    pub(crate) fn write_close(&self, out: &mut String) {
        if !self.classes().is_empty() {
            out.push_str("</span>");
        }
    }
}

pub(crate) fn write_html_escaped_char(out: &mut String, ch: char) {
    if ch == '\u{fffd}' {
        return;
    }
    if ch as u32 >= 256 {
        out.push(ch);
        return;
    }
    match ch {
        '&' => out.push_str("&amp;"),
        '\'' => out.push_str("&#39;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&#34;"),
        _ => out.push(ch),
    }
}

pub(crate) fn write_html_escaped(out: &mut String, s: &str) {
    for ch in s.chars() {
        write_html_escaped_char(out, ch);
    }
}
