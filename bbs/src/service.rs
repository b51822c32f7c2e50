use async_trait::async_trait;

use crate::Article;
use crate::ArticlePart;
use crate::Board;
use crate::BoardRef;
use crate::Error;
use crate::Result;
use crate::SelectMethod;

/// The upstream BBS service. Implementations live outside this workspace;
/// everything here consumes the trait (and test fakes of it).
///
/// Any call may fail with [`Error::NotFound`] for missing boards/articles,
/// or [`Error::Transport`] for everything else.
#[async_trait]
pub trait Bbs: Send + Sync {
    async fn get_boards(&self, refs: &[BoardRef]) -> Result<Vec<Board>>;

    async fn get_article_list(
        &self,
        r#ref: &BoardRef,
        offset: isize,
        length: usize,
    ) -> Result<Vec<Article>>;

    async fn get_bottom_list(&self, r#ref: &BoardRef) -> Result<Vec<Article>>;

    /// Selects a byte range of one article. `offset` may be negative to
    /// address from the end (tail selects); `max_len` of `-1` means no limit.
    async fn get_article_select(
        &self,
        r#ref: &BoardRef,
        method: SelectMethod,
        filename: &str,
        cache_key: &str,
        offset: isize,
        max_len: isize,
    ) -> Result<ArticlePart>;

    async fn hotboards(&self) -> Result<Vec<Board>>;

    /// Returns one page of matches plus the total match count.
    async fn search(
        &self,
        r#ref: &BoardRef,
        predicates: &[SearchPredicate],
        offset: isize,
        length: usize,
    ) -> Result<(Vec<Article>, usize)>;
}

/// Collapses a single-board lookup, insisting on exactly one result.
pub fn one_board(boards: Vec<Board>) -> Result<Board> {
    let mut boards = boards;
    match (boards.pop(), boards.pop()) {
        (Some(board), None) => Ok(board),
        _ => Err(Error::Transport("expect one board".to_owned())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPredicate {
    Title(String),
    ExactTitle(String),
    Author(String),
    Recommend(i32),
}

impl SearchPredicate {
    pub fn with_title(title: impl Into<String>) -> Self {
        Self::Title(title.into())
    }

    pub fn with_exact_title(title: impl Into<String>) -> Self {
        Self::ExactTitle(title.into())
    }

    pub fn with_author(author: impl Into<String>) -> Self {
        Self::Author(author.into())
    }

    /// Recommend-count filter, clamped to the protocol range.
    pub fn with_recommend(n: i32) -> Self {
        Self::Recommend(n.clamp(-100, 100))
    }
}
