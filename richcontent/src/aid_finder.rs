use std::sync::LazyLock;

use bbsweb_bbs::Aid;
use regex::Captures;
use regex::Regex;

use crate::RenderContext;
use crate::RichContent;

type Handler = fn(&RenderContext, &Captures<'_>) -> Option<String>;

struct AidPattern {
    pattern: Regex,
    handler: Handler,
}

impl AidPattern {
    #[allow(clippy::unwrap_used)]
    fn new(pattern: &str, handler: Handler) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            handler,
        }
    }
}

static AID_PATTERNS: LazyLock<Vec<AidPattern>> = LazyLock::new(|| {
    vec![
        AidPattern::new(
            r"([0-9A-Za-z\-_]{1,12}) 看板 #([0-9A-Za-z\-_@]{8,10})",
            handle_board_aid_text,
        ),
        AidPattern::new(
            r"#([0-9A-Za-z\-_@]{8,10}) \(([0-9A-Za-z\-_]{1,12})\)",
            handle_aid_board_text,
        ),
        AidPattern::new(r"#([0-9A-Za-z\-_@]{8,10})", handle_aid_text),
    ]
});

/// Article-ID references in prose, resolved into site-internal links. IDs
/// that fail to parse, and bare IDs with no board in context, are silently
/// skipped.
pub(crate) fn find_aids(ctx: &RenderContext, input: &str) -> Vec<RichContent> {
    // Fast path.
    if !input.contains('#') {
        return Vec::new();
    }

    let mut rcs = Vec::new();
    for p in AID_PATTERNS.iter() {
        for caps in p.pattern.captures_iter(input) {
            let Some(m) = caps.get(0) else { continue };
            if let Some(link) = (p.handler)(ctx, &caps) {
                rcs.push(RichContent {
                    begin: m.start(),
                    end: m.end(),
                    url: link,
                    components: Vec::new(),
                });
            }
        }
    }
    rcs
}

fn aid_link(ctx: &RenderContext, brd_name: &str, aid_text: &str) -> Option<String> {
    let aid = Aid::parse(aid_text).ok()?;
    let linker = ctx.linker.as_ref()?;
    Some(linker.article_url(brd_name, &aid.filename()))
}

/// `#AIDC` — resolves against the board in the rendering context.
fn handle_aid_text(ctx: &RenderContext, caps: &Captures<'_>) -> Option<String> {
    let brd_name = ctx.brd_name.clone()?;
    aid_link(ctx, &brd_name, caps.get(1)?.as_str())
}

/// `#AIDC (brdname)`
fn handle_aid_board_text(ctx: &RenderContext, caps: &Captures<'_>) -> Option<String> {
    aid_link(ctx, caps.get(2)?.as_str(), caps.get(1)?.as_str())
}

/// `brdname 看板 #AIDC`
fn handle_board_aid_text(ctx: &RenderContext, caps: &Captures<'_>) -> Option<String> {
    aid_link(ctx, caps.get(1)?.as_str(), caps.get(2)?.as_str())
}
