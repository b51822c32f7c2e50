use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use bbsweb_bbs::Board;
use bbsweb_bbs::SearchPredicate;
use bbsweb_cache::Key;
use sha2::Digest;
use sha2::Sha256;

/// Renders one article of a board.
#[derive(Debug, Clone)]
pub struct ArticleRequest {
    /// Cache namespace; distinct consumers (bbs pages, man pages) share the
    /// entity shape but not entries.
    pub namespace: String,
    pub brd: Board,
    pub filename: String,
}

impl Key for ArticleRequest {
    fn cache_key(&self) -> String {
        format!("bbsweb:{}/{}/{}", self.namespace, self.brd.brd_name, self.filename)
    }
}

/// Polls one article for content past `offset`.
#[derive(Debug, Clone)]
pub struct ArticlePartRequest {
    pub brd: Board,
    pub filename: String,
    pub cache_key: String,
    pub offset: usize,
}

impl Key for ArticlePartRequest {
    fn cache_key(&self) -> String {
        format!(
            "bbsweb:bbs/{}/{}#{},{}",
            self.brd.brd_name, self.filename, self.cache_key, self.offset
        )
    }
}

/// One page of a board's article list. Page 0 selects the last page.
#[derive(Debug, Clone)]
pub struct BbsIndexRequest {
    pub brd: Board,
    pub page: usize,
}

impl Key for BbsIndexRequest {
    fn cache_key(&self) -> String {
        format!("bbsweb:bbsindex/{}/{}", self.brd.brd_name, self.page)
    }
}

/// One page of search results on a board.
#[derive(Debug, Clone)]
pub struct BbsSearchRequest {
    pub brd: Board,
    pub page: usize,
    pub query: String,
    pub predicates: Vec<SearchPredicate>,
}

impl Key for BbsSearchRequest {
    fn cache_key(&self) -> String {
        // Queries are free text; hash them to keep the key well-formed.
        let query_hash = URL_SAFE.encode(Sha256::digest(self.query.as_bytes()));
        format!(
            "bbsweb:bbssearch/{}/{}/{}",
            self.brd.brd_name, self.page, query_hash
        )
    }
}

/// Feed source data for a board.
#[derive(Debug, Clone)]
pub struct BoardFeedRequest {
    pub brd: Board,
}

impl Key for BoardFeedRequest {
    fn cache_key(&self) -> String {
        format!("bbsweb:feed/{}", self.brd.brd_name)
    }
}
