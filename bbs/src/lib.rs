//! Domain types for the upstream BBS: boards, articles, article IDs and the
//! line-format conventions articles follow, plus the [`Bbs`] service trait the
//! gateway consumes.

mod aid;
mod service;
mod strings;
mod types;

pub use aid::Aid;
pub use service::Bbs;
pub use service::SearchPredicate;
pub use service::one_board;
pub use strings::ARTICLE_AUTHOR;
pub use strings::ARTICLE_TITLE;
pub use strings::PUSH_PREFIX_STRINGS;
pub use strings::QUOTE_PREFIX_STRINGS;
pub use strings::SIGNATURE_PREFIX_STRINGS;
pub use strings::is_valid_article_file_name;
pub use strings::is_valid_brd_name;
pub use strings::is_valid_user_id;
pub use strings::match_prefix;
pub use strings::normalize_subject;
pub use strings::parse_article_first_line;
pub use strings::parse_article_meta_line;
pub use strings::parse_file_name_time;
pub use types::Article;
pub use types::ArticlePart;
pub use types::Board;
pub use types::BoardId;
pub use types::BoardRef;
pub use types::SelectMethod;
pub use types::file_modes;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The board or article does not exist upstream. Mapped to a
    /// user-visible 404 by the enclosing HTTP layer.
    #[error("not found")]
    NotFound,
    #[error("invalid aid")]
    InvalidAid,
    #[error("invalid filename pattern")]
    InvalidFileName,
    /// Anything that went wrong talking to the remote service.
    #[error("transport: {0}")]
    Transport(String),
}
