use bbsweb_bbs::Board;
use serde::Deserialize;
use serde::Serialize;

/// A fully rendered article, immutable once stored in the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub parsed_title: String,
    pub preview_content: String,
    pub content_html: String,
    pub content_tail_html: String,
    /// Only the head (and tail) of an oversized article rendered.
    pub is_partial: bool,
    pub is_truncated: bool,

    /// Upstream consistency handle for polling continuations.
    pub cache_key: String,
    pub next_offset: usize,

    /// `false` marks a cached "does not exist" answer.
    pub is_valid: bool,
}

/// A rendered continuation of an article, fetched while polling for new
/// pushes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticlePart {
    pub content_html: String,
    pub cache_key: String,
    pub next_offset: usize,
    pub is_valid: bool,
}

/// One page of a board's article list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BbsIndex {
    pub board: Board,

    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: usize,
    pub next_page: usize,
    pub total_page: usize,

    /// The search text when this index is a search result page.
    pub query: String,

    pub articles: Vec<bbsweb_bbs::Article>,
    /// Pinned entries, present on the last page only.
    pub bottoms: Vec<bbsweb_bbs::Article>,

    pub is_valid: bool,
}

/// Newest articles of a board with preview snippets; the feed layer shapes
/// this into Atom XML outside the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardFeed {
    pub board: Board,
    pub posts: Vec<PostEntry>,
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostEntry {
    pub article: bbsweb_bbs::Article,
    pub snippet: String,
}
