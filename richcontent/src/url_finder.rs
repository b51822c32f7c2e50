use std::sync::LazyLock;

use regex::Captures;
use regex::Regex;

use crate::Component;
use crate::RenderContext;
use crate::RichContent;
use crate::html_escape;
use crate::url_detect::find_all_urls_index;

type Handler = fn(&RenderContext, &str, &Captures<'_>) -> Vec<Component>;

struct UrlPattern {
    pattern: Regex,
    handler: Handler,
}

impl UrlPattern {
    #[allow(clippy::unwrap_used)]
    fn new(pattern: &str, handler: Handler) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            handler,
        }
    }
}

static URL_PATTERNS: LazyLock<Vec<UrlPattern>> = LazyLock::new(|| {
    vec![
        UrlPattern::new(
            r"^https?://(?:www\.youtube\.com/watch\?(?:.+&)*v=|youtu\.be/)([\w\-]+)",
            handle_youtube,
        ),
        // Some users link the http form of the direct-image host.
        UrlPattern::new(
            r"^https?://i\.imgur\.com/(\w+)\.(?i:png|jpeg|jpg|gif)$",
            handle_imgur_image,
        ),
        UrlPattern::new(
            r"^https?://imgur\.com/([,\w]+)(?:#(\d+))?[^/]*$",
            handle_imgur_album,
        ),
        UrlPattern::new(r"^http://picmoe\.net/d\.php\?id=(\d+)", handle_picmoe),
        UrlPattern::new(r"\.(?i:png|jpeg|jpg|gif)$", handle_generic_image),
    ]
});

/// URL spans with their embed components. The first matching pattern wins;
/// URLs matching no pattern still become plain links.
pub(crate) fn find_urls(ctx: &RenderContext, input: &str) -> Vec<RichContent> {
    let mut rcs = Vec::with_capacity(4);
    for range in find_all_urls_index(input) {
        let url = &input[range.clone()];
        let mut components = Vec::new();
        for p in URL_PATTERNS.iter() {
            if let Some(caps) = p.pattern.captures(url) {
                components = (p.handler)(ctx, url, &caps);
                break;
            }
        }
        rcs.push(RichContent {
            begin: range.start,
            end: range.end,
            url: url.to_owned(),
            components,
        });
    }
    rcs
}

/// `<img>` for `url`, routed through the external image cache when one is
/// attached to the request.
fn image_html_tag(ctx: &RenderContext, url: &str) -> String {
    let url = match &ctx.ext_cache {
        Some(cache) => cache.generate(url).unwrap_or_else(|_| url.to_owned()),
        None => url.to_owned(),
    };
    format!(r#"<img src="{}" alt="" />"#, html_escape(&url))
}

fn handle_youtube(_ctx: &RenderContext, _url: &str, caps: &Captures<'_>) -> Vec<Component> {
    let Some(id) = caps.get(1) else {
        return Vec::new();
    };
    vec![Component::new(format!(
        r#"<div class="resize-container"><div class="resize-content"><iframe class="youtube-player" type="text/html" src="//www.youtube.com/embed/{}" frameborder="0" allowfullscreen></iframe></div></div>"#,
        id.as_str()
    ))]
}

fn handle_imgur_image(ctx: &RenderContext, url: &str, _caps: &Captures<'_>) -> Vec<Component> {
    vec![Component::new(image_html_tag(ctx, url))]
}

fn handle_imgur_album(_ctx: &RenderContext, _url: &str, caps: &Captures<'_>) -> Vec<Component> {
    let Some(ids) = caps.get(1) else {
        return Vec::new();
    };
    ids.as_str()
        .split(',')
        .map(|id| {
            Component::new(format!(
                r#"<blockquote class="imgur-embed-pub" lang="en" data-id="{id}"><a href="//imgur.com/{id}"></a></blockquote><script async src="//s.imgur.com/min/embed.js" charset="utf-8"></script>"#
            ))
        })
        .collect()
}

fn handle_picmoe(ctx: &RenderContext, _url: &str, caps: &Captures<'_>) -> Vec<Component> {
    let Some(id) = caps.get(1) else {
        return Vec::new();
    };
    let link = format!("http://picmoe.net/src/{}s.jpg", id.as_str());
    vec![Component::new(image_html_tag(ctx, &link))]
}

fn handle_generic_image(ctx: &RenderContext, url: &str, _caps: &Captures<'_>) -> Vec<Component> {
    vec![Component::new(image_html_tag(ctx, url))]
}
