use bbsweb_ansi::EscapeSequence;
use bbsweb_ansi::Visitor;
use bbsweb_bbs::ARTICLE_TITLE;
use bbsweb_bbs::QUOTE_PREFIX_STRINGS;
use bbsweb_bbs::SIGNATURE_PREFIX_STRINGS;
use bbsweb_bbs::match_prefix;
use bbsweb_bbs::parse_article_first_line;
use bbsweb_bbs::parse_article_meta_line;
use bbsweb_richcontent::RenderContext;
use bbsweb_richcontent::RichContent;

use crate::index_mapper::IndexMapper;
use crate::segment::CLASS_ARTICLE_META_LINE;
use crate::segment::CLASS_ARTICLE_META_LINE_RIGHT;
use crate::segment::CLASS_ARTICLE_META_TAG;
use crate::segment::CLASS_ARTICLE_META_VALUE;
use crate::segment::CLASS_PUSH_DIV;
use crate::segment::ExtraFlags;
use crate::segment::Segment;
use crate::segment::write_html_escaped;
use crate::terminal::DEFAULT_BG;
use crate::terminal::TerminalState;
use crate::util::make_external_url_link;
use crate::util::match_push_line;

const PREVIEW_CONTENT_LINES: usize = 5;

/// Builder for one article render.
pub struct Render<'a> {
    content: &'a [u8],
    ctx: RenderContext,
    disable_article_header: bool,
}

impl<'a> Render<'a> {
    pub fn new(content: &'a [u8]) -> Self {
        Self {
            content,
            ctx: RenderContext::default(),
            disable_article_header: false,
        }
    }

    pub fn with_context(mut self, ctx: RenderContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Skip the meta-line phase; used for tails and polled continuations
    /// where the header already rendered.
    pub fn without_article_header(mut self) -> Self {
        self.disable_article_header = true;
        self
    }

    /// Runs the pipeline. Total: malformed input degrades, never fails.
    pub fn render(self) -> RenderedArticle {
        let mut r = Renderer::new(self.ctx, self.disable_article_header);
        bbsweb_ansi::parse(self.content, &mut r);
        // Simulate end of line if there isn't one at the end.
        if !r.line_buf.is_empty() {
            r.end_of_line();
        }
        RenderedArticle {
            parsed_title: r.title,
            preview_content: r.preview_content,
            html: r.buf,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedArticle {
    pub parsed_title: String,
    pub preview_content: String,
    pub html: String,
}

/// Per-render state. Everything here lives for one render call; segments
/// and the mapper are truncated at every line flush.
struct Renderer {
    ctx: RenderContext,
    disable_article_header: bool,

    buf: String,
    line_no: usize,

    mapper: IndexMapper,
    line_buf: String,
    line_segs: Vec<Segment>,
    seg_index: usize,
    seg_offset: usize,
    seg_closed: bool,

    terminal_state: TerminalState,

    accept_meta_lines: bool,

    title: String,

    preview_content: String,
    preview_line_count: usize,
}

impl Visitor for Renderer {
    fn print(&mut self, ch: char) {
        self.one_rune(ch);
    }

    fn escape(&mut self, esc: &EscapeSequence) {
        self.terminal_state.apply_escape_sequence(esc);
        let state_changed = match self.line_segs.last() {
            Some(seg) => seg.term_state != self.terminal_state,
            None => true,
        };
        if self.seg_closed || state_changed {
            self.start_segment();
        }
    }
}

impl Renderer {
    fn new(ctx: RenderContext, disable_article_header: bool) -> Self {
        Self {
            ctx,
            disable_article_header,
            buf: String::new(),
            line_no: 1,
            mapper: IndexMapper::new(),
            line_buf: String::new(),
            line_segs: Vec::with_capacity(8),
            seg_index: 0,
            seg_offset: 0,
            seg_closed: true,
            terminal_state: TerminalState::default(),
            accept_meta_lines: true,
            title: String::new(),
            preview_content: String::new(),
            preview_line_count: 0,
        }
    }

    fn start_segment(&mut self) {
        if !self.seg_closed {
            self.end_segment();
        }
        // When discarding an empty segment exposes a predecessor in the same
        // state, continue it instead of emitting twin spans back to back.
        if let Some(last) = self.line_segs.last()
            && last.term_state == self.terminal_state
        {
            self.seg_closed = false;
            return;
        }
        self.line_segs.push(Segment::new(self.terminal_state));
        self.seg_closed = false;
    }

    fn end_segment(&mut self) {
        if let Some(last) = self.line_segs.last()
            && last.is_empty()
        {
            self.line_segs.pop();
        }
        self.seg_closed = true;
    }

    fn ensure_open_segment(&mut self) {
        if self.line_segs.is_empty() || self.seg_closed {
            self.start_segment();
        }
    }

    fn one_rune(&mut self, ch: char) {
        self.ensure_open_segment();
        let seg_index = self.line_segs.len() - 1;
        let seg_len = self.line_segs[seg_index].len();
        self.mapper.record(self.line_buf.len(), seg_index, seg_len);
        self.line_segs[seg_index].write_escaped_char(ch);
        self.line_buf.push(ch);

        if ch == '\n' {
            self.end_of_line();
        }
    }

    fn end_of_line(&mut self) {
        if !self.seg_closed {
            // Also discards a trailing still-empty segment.
            self.end_segment();
        }

        // Map past-the-end of the line to past-the-end of the segments.
        self.mapper
            .record(self.line_buf.len(), self.line_segs.len(), 0);
        let line = self.line_buf.clone();
        let mut parsed = false;

        if !self.disable_article_header && self.accept_meta_lines && self.line_no < 5 {
            if self.line_no == 1 && self.match_first_line_and_output(&line) {
                parsed = true;
            } else if let Some((tag, val)) = parse_article_meta_line(&line) {
                if tag == ARTICLE_TITLE {
                    self.title = val.to_owned();
                }
                self.write_meta_line(tag, val, CLASS_ARTICLE_META_LINE);
                parsed = true;
            } else {
                self.accept_meta_lines = false;
            }
        }

        if !parsed {
            let mut is_main_content = false;
            if !self.line_segs.is_empty() {
                if match_prefix(&line, QUOTE_PREFIX_STRINGS) {
                    self.line_segs[0].term_state.set_color(6, DEFAULT_BG, false);
                } else if match_prefix(&line, SIGNATURE_PREFIX_STRINGS) {
                    self.line_segs[0].term_state.set_color(2, DEFAULT_BG, false);
                } else {
                    // Non-empty, not quote, and not signature line.
                    is_main_content = true;
                }
            }

            // Collect non-empty lines as preview starting at the first main
            // content line.
            let is_empty = line.trim().is_empty();
            let can_collect = !is_empty
                && (self.preview_line_count == 0 && is_main_content
                    || self.preview_line_count > 0);
            if can_collect && self.preview_line_count < PREVIEW_CONTENT_LINES {
                self.preview_content.push_str(&line);
                self.preview_line_count += 1;
            }

            self.process_normal_content_line(&line);
        }

        // Reset per-line state.
        self.mapper.reset();
        self.line_buf.clear();
        self.line_segs.clear();
        self.seg_index = 0;
        self.seg_offset = 0;
        self.seg_closed = true;
        self.line_no += 1;
    }

    fn match_first_line_and_output(&mut self, line: &str) -> bool {
        let Some((tag1, val1, tag2, val2)) = parse_article_first_line(line) else {
            return false;
        };
        self.write_meta_line(tag1, val1, CLASS_ARTICLE_META_LINE);
        self.write_meta_line(tag2, val2, CLASS_ARTICLE_META_LINE_RIGHT);
        true
    }

    fn write_meta_line(&mut self, tag: &str, val: &str, div_class: &str) {
        self.buf.push_str("<div class=\"");
        self.buf.push_str(div_class);
        self.buf.push_str("\"><span class=\"");
        self.buf.push_str(CLASS_ARTICLE_META_TAG);
        self.buf.push_str("\">");
        write_html_escaped(&mut self.buf, tag);
        self.buf.push_str("</span><span class=\"");
        self.buf.push_str(CLASS_ARTICLE_META_VALUE);
        self.buf.push_str("\">");
        write_html_escaped(&mut self.buf, val);
        self.buf.push_str("</span></div>");
    }

    fn process_normal_content_line(&mut self, line: &str) {
        // Detect push line.
        let is_push = match_push_line(&self.line_segs);
        if is_push {
            self.line_segs[0].extra_flags.insert(ExtraFlags::PUSH_TAG);
            self.line_segs[1]
                .extra_flags
                .insert(ExtraFlags::PUSH_USER_ID);
            self.line_segs[2]
                .extra_flags
                .insert(ExtraFlags::PUSH_CONTENT);
            self.line_segs[3]
                .extra_flags
                .insert(ExtraFlags::PUSH_IP_DATETIME);
            self.line_segs[2].trim_right_spaces();
            self.buf.push_str("<div class=\"");
            self.buf.push_str(CLASS_PUSH_DIV);
            self.buf.push_str("\">");
        }

        let rcs: Vec<RichContent> = bbsweb_richcontent::find(&self.ctx, line);

        for rc in &rcs {
            let link_begin = make_external_url_link(&rc.url);

            let (bseg, boff) = self.mapper.get(rc.begin);
            let (eseg, eoff) = self.mapper.get(rc.end);
            self.output_to_segment(bseg, boff);
            if bseg == eseg {
                // Same segment: embed the anchor inside it.
                self.maybe_open_current_segment();
                self.buf.push_str(&link_begin);
                self.output_to_segment(eseg, eoff);
                self.buf.push_str("</a>");
            } else {
                // Different segments: the anchor wraps whole segments.
                self.maybe_close_current_segment();
                self.buf.push_str(&link_begin);
                self.output_to_segment(eseg, eoff);
                self.maybe_close_current_segment();
                self.buf.push_str("</a>");
            }
        }
        self.output_to_segment(self.line_segs.len(), 0);

        if is_push {
            self.buf.push_str("</div>");
        }

        // Append rich contents after the line.
        for rc in &rcs {
            for comp in &rc.components {
                self.buf.push_str("<div class=\"richcontent\">");
                self.buf.push_str(comp.html());
                self.buf.push_str("</div>");
            }
        }
    }

    /// Emits segments from the cursor up to segment `i`, then the first
    /// `off` escaped bytes of segment `i`.
    fn output_to_segment(&mut self, i: usize, off: usize) {
        while self.seg_index < i {
            self.maybe_open_current_segment();
            let from = self.seg_offset;
            let seg_len = self.line_segs[self.seg_index].len();
            self.buf
                .push_str(self.line_segs[self.seg_index].inner_slice(from, seg_len));
            self.maybe_close_current_segment();
            // Advance to the next segment at offset 0.
            self.seg_offset = 0;
            self.seg_index += 1;
        }
        if off > 0 {
            self.maybe_open_current_segment();
            let from = self.seg_offset;
            self.buf
                .push_str(self.line_segs[self.seg_index].inner_slice(from, off));
            self.seg_offset = off;
        }
    }

    fn maybe_open_current_segment(&mut self) {
        if self.seg_closed {
            self.line_segs[self.seg_index].write_open(&mut self.buf);
            self.seg_closed = false;
        }
    }

    fn maybe_close_current_segment(&mut self) {
        if !self.seg_closed {
            self.line_segs[self.seg_index].write_close(&mut self.buf);
            self.seg_closed = true;
        }
    }
}
