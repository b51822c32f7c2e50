#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use bbsweb_article::Render;
use bbsweb_richcontent::ArticleLinker;
use bbsweb_richcontent::RenderContext;
use pretty_assertions::assert_eq;

struct PathLinker;

impl ArticleLinker for PathLinker {
    fn article_url(&self, brd_name: &str, filename: &str) -> String {
        format!("/bbs/{brd_name}/{filename}.html")
    }
}

fn render_body(input: &str) -> String {
    Render::new(input.as_bytes())
        .without_article_header()
        .render()
        .html
}

#[test]
fn link_crossing_segments() {
    assert_eq!(
        render_body("\x1b[31mhttp://exam\x1b[32mple.com/ bar\x1b[m"),
        "<a href=\"http://example.com/\" target=\"_blank\" rel=\"nofollow\">\
         <span class=\"f1\">http://exam</span><span class=\"f2\">ple.com/</span></a>\
         <span class=\"f2\"> bar</span>"
    );
}

#[test]
fn link_spans_two_segments_at_end_of_input() {
    assert_eq!(
        render_body("\x1b[31mhttp://exam\x1b[32mple.com/"),
        "<a href=\"http://example.com/\" target=\"_blank\" rel=\"nofollow\">\
         <span class=\"f1\">http://exam</span><span class=\"f2\">ple.com/</span></a>"
    );
}

#[test]
fn link_at_beginning_of_a_segment() {
    assert_eq!(
        render_body("\x1b[31mhttp://example.com/ bar\x1b[m"),
        "<span class=\"f1\">\
         <a href=\"http://example.com/\" target=\"_blank\" rel=\"nofollow\">http://example.com/</a> \
         bar</span>"
    );
}

#[test]
fn push_line_recognition() {
    let input = "\x1b[1;31m推 \x1b[33muser123\x1b[m\x1b[33m: nice post  \x1b[m 08/02 12:34\n";
    assert_eq!(
        render_body(input),
        "<div class=\"push\">\
         <span class=\"f1 hl push-tag\">推 </span>\
         <span class=\"f3 hl push-userid\">user123</span>\
         <span class=\"f3 push-content\">: nice post</span>\
         <span class=\"push-ipdatetime\"> 08/02 12:34\n</span>\
         </div>"
    );
}

#[test]
fn arrow_push_line_with_white_tag() {
    let input = "\x1b[1m→ \x1b[33muser123\x1b[m\x1b[33m: ok\x1b[m 08/02\n";
    let html = render_body(input);
    assert!(html.starts_with("<div class=\"push\">"), "{html}");
    assert!(html.contains("push-tag"), "{html}");
}

#[test]
fn four_segments_with_wrong_colors_are_not_push() {
    // Tag segment not highlighted.
    let input = "\x1b[31m推 \x1b[1;33muser123\x1b[m\x1b[33m: ok\x1b[m 08/02\n";
    let html = render_body(input);
    assert!(!html.contains("class=\"push\""), "{html}");
}

#[test]
fn meta_lines_and_title_extraction() {
    let input = "作者: someone (nick) 看板: test\n標題: [問題] 安安\n\ncontent line\n";
    let rendered = Render::new(input.as_bytes()).render();

    assert_eq!(rendered.parsed_title, "[問題] 安安");
    assert_eq!(rendered.preview_content, "content line\n");
    assert_eq!(
        rendered.html,
        "<div class=\"article-metaline\"><span class=\"article-meta-tag\">作者</span>\
         <span class=\"article-meta-value\">someone (nick)</span></div>\
         <div class=\"article-metaline-right\"><span class=\"article-meta-tag\">看板</span>\
         <span class=\"article-meta-value\">test</span></div>\
         <div class=\"article-metaline\"><span class=\"article-meta-tag\">標題</span>\
         <span class=\"article-meta-value\">[問題] 安安</span></div>\
         \ncontent line\n"
    );
}

#[test]
fn non_meta_line_disables_further_meta_parsing() {
    let input = "not a header\n標題: too late\n";
    let rendered = Render::new(input.as_bytes()).render();
    assert_eq!(rendered.parsed_title, "");
    assert!(!rendered.html.contains("article-metaline"), "{}", rendered.html);
}

#[test]
fn preview_stops_after_five_main_content_lines() {
    let input = "one\ntwo\nthree\nfour\nfive\nsix\n";
    let rendered = Render::new(input.as_bytes())
        .without_article_header()
        .render();
    assert_eq!(rendered.preview_content, "one\ntwo\nthree\nfour\nfive\n");
}

#[test]
fn preview_skips_leading_quotes_but_keeps_later_ones() {
    let input = "> quoted\nreal content\n> more quote\n";
    let rendered = Render::new(input.as_bytes())
        .without_article_header()
        .render();
    assert_eq!(rendered.preview_content, "real content\n> more quote\n");
}

#[test]
fn quote_and_signature_lines_recolor() {
    assert_eq!(
        render_body("> quoted\n"),
        "<span class=\"f6\">&gt; quoted\n</span>"
    );
    assert_eq!(
        render_body("※ 發信站: 批踢踢\n"),
        "<span class=\"f2\">※ 發信站: 批踢踢\n</span>"
    );
}

#[test]
fn image_url_appends_richcontent_div() {
    assert_eq!(
        render_body("http://i.imgur.com/a1.jpg\n"),
        "<a href=\"http://i.imgur.com/a1.jpg\" target=\"_blank\" rel=\"nofollow\">\
         http://i.imgur.com/a1.jpg</a>\n\
         <div class=\"richcontent\"><img src=\"http://i.imgur.com/a1.jpg\" alt=\"\" /></div>"
    );
}

#[test]
fn bare_aid_links_against_context_board() {
    let ctx = RenderContext::default()
        .with_brd_name("test")
        .with_linker(Arc::new(PathLinker));
    let rendered = Render::new("看 #1HNXB7zo 這篇\n".as_bytes())
        .with_context(ctx)
        .without_article_header()
        .render();
    assert_eq!(
        rendered.html,
        "看 <a href=\"/bbs/test/M.1365119687.A.F72.html\" target=\"_blank\" rel=\"nofollow\">\
         #1HNXB7zo</a> 這篇\n"
    );
}

#[test]
fn html_metacharacters_are_escaped() {
    assert_eq!(
        render_body("<b> & \"quoted\" 'x'\n"),
        "&lt;b&gt; &amp; &#34;quoted&#34; &#39;x&#39;\n"
    );
}

// The concatenated plain text of a render equals the ANSI-stripped input.
#[test]
fn plain_text_is_preserved() {
    let input = "\x1b[1;33m安安 http://example.com/ yo\x1b[m bar\n";
    let html = render_body(input);
    let stripped = strip_tags(&html);
    assert_eq!(stripped, "安安 http://example.com/ yo bar\n");
}

fn strip_tags(html: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
}
