//! Inline link and embed detection for rendered article lines.
//!
//! Finders scan the plain bytes of one line and report spans to hyperlink,
//! optionally with embeddable HTML components (image tags, video iframes)
//! that the renderer appends after the line. Overlapping spans are resolved
//! deterministically: earliest begin wins, longest wins on ties.

mod aid_finder;
mod context;
mod url_detect;
mod url_finder;

pub use context::ArticleLinker;
pub use context::RenderContext;
pub use url_detect::find_all_urls;

/// A block of HTML to embed after the line that referenced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    html: String,
}

impl Component {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

/// One linkified span of a line: `input[begin..end]` becomes an anchor to
/// `url`, and `components` are appended after the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichContent {
    pub begin: usize,
    pub end: usize,
    pub url: String,
    pub components: Vec<Component>,
}

/// Runs every finder over `input` and resolves overlaps: spans are kept in
/// (begin ascending, longest-first) order, and a span survives iff it starts
/// at or after the previous survivor's end.
pub fn find(ctx: &RenderContext, input: &str) -> Vec<RichContent> {
    let mut rcs = url_finder::find_urls(ctx, input);
    rcs.extend(aid_finder::find_aids(ctx, input));

    rcs.sort_by(|a, b| a.begin.cmp(&b.begin).then(b.end.cmp(&a.end)));

    let mut filtered = Vec::with_capacity(rcs.len());
    let mut left = 0;
    for rc in rcs {
        if left <= rc.begin {
            left = rc.end;
            filtered.push(rc);
        }
    }
    filtered
}

/// Minimal attribute-value escaping for URLs interpolated into HTML.
fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;

    struct PathLinker;

    impl ArticleLinker for PathLinker {
        fn article_url(&self, brd_name: &str, filename: &str) -> String {
            format!("/bbs/{brd_name}/{filename}.html")
        }
    }

    fn ctx_with_board(brd_name: &str) -> RenderContext {
        RenderContext {
            brd_name: Some(brd_name.to_owned()),
            linker: Some(Arc::new(PathLinker)),
            ..RenderContext::default()
        }
    }

    #[test]
    fn url_and_aid_spans_merge_without_overlap() {
        let ctx = ctx_with_board("test");
        let line = "see http://example.com and #1HNXB7zo too\n";
        let found = find(&ctx, line);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].url, "http://example.com");
        assert_eq!(found[1].url, "/bbs/test/M.1365119687.A.F72.html");
        assert!(found[0].end <= found[1].begin);
    }

    #[test]
    fn longest_span_wins_on_equal_begin() {
        let ctx = ctx_with_board("test");
        // The bare-aid pattern also matches inside the aid-with-board form;
        // the longer span must win.
        let found = find(&ctx, "#1HNXB7zo (SomeBoard)");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "/bbs/SomeBoard/M.1365119687.A.F72.html");
    }

    #[test]
    fn detected_urls_parse_and_order() {
        let ctx = RenderContext::default();
        for rc in find(&ctx, "x http://a.example/(ok) then https://b.example/q?x=1#f\n") {
            assert!(rc.begin < rc.end);
            assert!(rc.url.starts_with("http"));
        }
    }
}
