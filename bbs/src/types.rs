use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Numeric board identity assigned by the upstream service.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BoardId(pub u32);

/// How a board is addressed in upstream calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoardRef {
    Bid(BoardId),
    Name(String),
}

impl BoardRef {
    pub fn by_bid(bid: BoardId) -> Self {
        Self::Bid(bid)
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub bid: BoardId,
    pub is_board: bool,
    pub over18: bool,
    pub hidden: bool,
    pub brd_name: String,
    pub title: String,
    pub class: String,
    pub bm: String,
    pub parent: BoardId,
    pub nuser: usize,
    pub num_posts: usize,
    pub children: Vec<BoardId>,
}

impl Board {
    pub fn r#ref(&self) -> BoardRef {
        BoardRef::Bid(self.bid)
    }
}

/// One row of a board's article list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub offset: usize,
    pub file_name: String,
    pub date: String,
    pub recommend: i32,
    pub file_mode: u32,
    pub owner: String,
    pub title: String,
    pub modified: DateTime<Utc>,
}

/// A byte range of one article file as served by the upstream selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticlePart {
    /// Opaque consistency handle; present it back when polling for more.
    pub cache_key: String,
    pub file_size: usize,
    pub offset: usize,
    pub length: usize,
    pub content: Vec<u8>,
}

/// Bits of [`Article::file_mode`] for non-mail files.
pub mod file_modes {
    pub const FILE_LOCAL: u32 = 1 << 0;
    pub const FILE_MARKED: u32 = 1 << 1;
    pub const FILE_DIGEST: u32 = 1 << 2;
    pub const FILE_BOTTOM: u32 = 1 << 3;
    pub const FILE_SOLVED: u32 = 1 << 4;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectMethod {
    Part,
    Head,
    Tail,
}

impl SelectMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectMethod::Part => "articlepart",
            SelectMethod::Head => "articlehead",
            SelectMethod::Tail => "articletail",
        }
    }
}
