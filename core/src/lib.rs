//! The gateway core: cacheable entities, their request keys, and the
//! generators that fetch article bytes upstream, drive the renderer and
//! populate the two-tier cache.

mod board_cache;
mod config;
mod entities;
mod gateway;
mod paging;
mod requests;
mod util;

pub use board_cache::BoardCache;
pub use config::Config;
pub use entities::Article;
pub use entities::ArticlePart;
pub use entities::BbsIndex;
pub use entities::BoardFeed;
pub use entities::PostEntry;
pub use gateway::ENTRY_PER_PAGE;
pub use gateway::Gateway;
pub use gateway::HEAD_SIZE;
pub use gateway::SNIPPET_HEAD_SIZE;
pub use gateway::TAIL_SIZE;
pub use paging::Paging;
pub use requests::ArticlePartRequest;
pub use requests::ArticleRequest;
pub use requests::BbsIndexRequest;
pub use requests::BbsSearchRequest;
pub use requests::BoardFeedRequest;
pub use util::truncate_large_content;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors a generator can deliver. `Clone` because one result fans out to
/// every coalesced waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A domain-level miss: page out of range, board unknown. The HTTP
    /// layer maps this to a 404.
    #[error("not found: {0}")]
    NotFound(String),
    /// Upstream service failure, including its own not-found sentinel.
    #[error(transparent)]
    Bbs(#[from] bbsweb_bbs::Error),
    /// Malformed request data (bad filename, bad article ID).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
