use std::sync::Arc;

use bbsweb_extcache::ExtCache;
use tokio_util::sync::CancellationToken;

/// Builds site-internal article URLs. The URL scheme belongs to the HTTP
/// layer; the renderer only needs this one capability from it.
pub trait ArticleLinker: Send + Sync {
    fn article_url(&self, brd_name: &str, filename: &str) -> String;
}

/// Per-request bag carried through the rendering pipeline.
#[derive(Clone, Default)]
pub struct RenderContext {
    /// Board the article lives on; bare article IDs resolve against it.
    pub brd_name: Option<String>,
    /// When present, image URLs are rewritten into signed cache URLs.
    pub ext_cache: Option<Arc<dyn ExtCache>>,
    pub linker: Option<Arc<dyn ArticleLinker>>,
    /// Cooperative cancellation for the request driving this render.
    pub cancel: CancellationToken,
}

impl RenderContext {
    pub fn with_brd_name(mut self, brd_name: impl Into<String>) -> Self {
        self.brd_name = Some(brd_name.into());
        self
    }

    pub fn with_ext_cache(mut self, ext_cache: Option<Arc<dyn ExtCache>>) -> Self {
        self.ext_cache = ext_cache;
        self
    }

    pub fn with_linker(mut self, linker: Arc<dyn ArticleLinker>) -> Self {
        self.linker = Some(linker);
        self
    }
}
