use bbsweb_bbs::PUSH_PREFIX_STRINGS;

use crate::segment::Segment;
use crate::segment::write_html_escaped;
use crate::terminal::TerminalState;

fn match_color(t: &TerminalState, fg: u8, bg: u8, highlighted: bool) -> bool {
    t.fg() == fg && t.bg() == bg && (!highlighted || t.highlighted())
}

/// A push line renders as exactly four segments whose leading texts and
/// colors follow the fixed client convention: tag, user id, content,
/// ip/date-time.
pub(crate) fn match_push_line(segs: &[Segment]) -> bool {
    segs.len() == 4
        && PUSH_PREFIX_STRINGS.iter().any(|p| segs[0].inner() == *p)
        && (match_color(&segs[0].term_state, 1, 0, true)
            || match_color(&segs[0].term_state, 7, 0, true))
        && match_color(&segs[1].term_state, 3, 0, true)
        && match_color(&segs[2].term_state, 3, 0, false)
        && match_color(&segs[3].term_state, 7, 0, false)
}

pub(crate) fn make_external_url_link(url: &str) -> String {
    let mut out = String::with_capacity(url.len() + 48);
    out.push_str("<a href=\"");
    write_html_escaped(&mut out, url);
    out.push_str("\" target=\"_blank\" rel=\"nofollow\">");
    out
}
