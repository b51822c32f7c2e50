use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bbsweb_article::Render;
use bbsweb_bbs::Bbs;
use bbsweb_bbs::Board;
use bbsweb_bbs::SearchPredicate;
use bbsweb_bbs::SelectMethod;
use bbsweb_cache::CacheManager;
use bbsweb_cache::Generator;
use bbsweb_cache::KvStore;
use bbsweb_cache::TypedManager;
use bbsweb_extcache::ExtCache;
use bbsweb_richcontent::ArticleLinker;
use bbsweb_richcontent::RenderContext;
use futures::FutureExt;
use tracing::warn;

use crate::ArticlePartRequest;
use crate::ArticleRequest;
use crate::BbsIndexRequest;
use crate::BbsSearchRequest;
use crate::BoardCache;
use crate::BoardFeedRequest;
use crate::Config;
use crate::Error;
use crate::Paging;
use crate::Result;
use crate::config::invalid_ttl;
use crate::entities::Article;
use crate::entities::ArticlePart;
use crate::entities::BbsIndex;
use crate::entities::BoardFeed;
use crate::entities::PostEntry;

pub const ENTRY_PER_PAGE: usize = 20;

/// Head bytes rendered for a full article view.
pub const HEAD_SIZE: usize = 100 * 1024;
/// Tail bytes rendered when the article is larger than the head window.
pub const TAIL_SIZE: usize = 50 * 1024;
/// Enough head bytes for a feed snippet: 8 pages of 80x24.
pub const SNIPPET_HEAD_SIZE: usize = 16 * 1024;

const TRUNCATE_SIZE: usize = 1 << 20;

struct Shared {
    bbs: Arc<dyn Bbs>,
    config: Config,
    linker: Option<Arc<dyn ArticleLinker>>,
    ext_cache: Option<Arc<dyn ExtCache>>,
}

impl Shared {
    fn render_context(&self, brd_name: &str) -> RenderContext {
        let mut ctx = RenderContext::default()
            .with_brd_name(brd_name)
            .with_ext_cache(self.ext_cache.clone());
        if let Some(linker) = &self.linker {
            ctx = ctx.with_linker(Arc::clone(linker));
        }
        ctx
    }
}

/// Front door of the core: request in, cached entity out. Every lookup runs
/// {KV fetch -> single-flight -> generate -> store} through the typed cache
/// managers; generators fetch upstream bytes and drive the renderer.
pub struct Gateway {
    shared: Arc<Shared>,
    board_cache: BoardCache,
    articles: TypedManager<ArticleRequest, Article, Error>,
    article_parts: TypedManager<ArticlePartRequest, ArticlePart, Error>,
    bbs_indexes: TypedManager<BbsIndexRequest, BbsIndex, Error>,
    bbs_searches: TypedManager<BbsSearchRequest, BbsIndex, Error>,
    board_feeds: TypedManager<BoardFeedRequest, BoardFeed, Error>,
}

impl Gateway {
    pub fn new(
        bbs: Arc<dyn Bbs>,
        kv: Arc<dyn KvStore>,
        mut config: Config,
        linker: Option<Arc<dyn ArticleLinker>>,
    ) -> Self {
        config.check_and_fill_defaults();
        let cache = CacheManager::new(kv, config.kv_max_open);
        let ext_cache = bbsweb_extcache::new(config.ext_cache.clone());
        let shared = Arc::new(Shared {
            bbs,
            config,
            linker,
            ext_cache,
        });

        Self {
            articles: cache.typed(make_generator(&shared, generate_article)),
            article_parts: cache.typed(make_generator(&shared, generate_article_part)),
            bbs_indexes: cache.typed(make_generator(&shared, generate_bbs_index)),
            bbs_searches: cache.typed(make_generator(&shared, generate_bbs_search)),
            board_feeds: cache.typed(make_generator(&shared, generate_board_feed)),
            board_cache: BoardCache::new(),
            shared,
        }
    }

    /// Board lookup by name, absorbed by the in-process board cache.
    pub async fn board_by_name(&self, brd_name: &str) -> Result<Board> {
        if !bbsweb_bbs::is_valid_brd_name(brd_name) {
            return Err(Error::InvalidInput(format!("bad board name: {brd_name}")));
        }
        Ok(self
            .board_cache
            .board_by_name(self.shared.bbs.as_ref(), brd_name)
            .await?)
    }

    pub async fn hotboards(&self) -> Result<Vec<Board>> {
        Ok(self.shared.bbs.hotboards().await?)
    }

    pub async fn article(&self, brd: Board, filename: impl Into<String>) -> Result<Article> {
        let filename = filename.into();
        if !bbsweb_bbs::is_valid_article_file_name(&filename) {
            return Err(Error::InvalidInput(format!("bad filename: {filename}")));
        }
        self.articles
            .get(ArticleRequest {
                namespace: "bbs".to_owned(),
                brd,
                filename,
            })
            .await
    }

    pub async fn article_part(
        &self,
        brd: Board,
        filename: impl Into<String>,
        cache_key: impl Into<String>,
        offset: usize,
    ) -> Result<ArticlePart> {
        let filename = filename.into();
        if !bbsweb_bbs::is_valid_article_file_name(&filename) {
            return Err(Error::InvalidInput(format!("bad filename: {filename}")));
        }
        self.article_parts
            .get(ArticlePartRequest {
                brd,
                filename,
                cache_key: cache_key.into(),
                offset,
            })
            .await
    }

    pub async fn bbs_index(&self, brd: Board, page: usize) -> Result<BbsIndex> {
        self.bbs_indexes.get(BbsIndexRequest { brd, page }).await
    }

    pub async fn bbs_search(
        &self,
        brd: Board,
        page: usize,
        query: impl Into<String>,
        predicates: Vec<SearchPredicate>,
    ) -> Result<BbsIndex> {
        self.bbs_searches
            .get(BbsSearchRequest {
                brd,
                page,
                query: query.into(),
                predicates,
            })
            .await
    }

    pub async fn board_feed(&self, brd: Board) -> Result<BoardFeed> {
        self.board_feeds.get(BoardFeedRequest { brd }).await
    }
}

fn make_generator<K, V, F, Fut>(shared: &Arc<Shared>, f: F) -> Generator<K, V, Error>
where
    K: Send + 'static,
    V: Send + 'static,
    F: Fn(Arc<Shared>, K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(V, Duration)>> + Send + 'static,
{
    let shared = Arc::clone(shared);
    Arc::new(move |key: K| f(Arc::clone(&shared), key).boxed())
}

async fn generate_article(shared: Arc<Shared>, r: ArticleRequest) -> Result<(Article, Duration)> {
    let ttl = shared.config.article_ttl();
    let brd_ref = r.brd.r#ref();

    // Head select; an AID-derived filename carries a synthetic ".000"
    // suffix old articles do not have, so retry once without it.
    let mut filename = r.filename.clone();
    let mut head = shared
        .bbs
        .get_article_select(
            &brd_ref,
            SelectMethod::Head,
            &filename,
            "",
            0,
            HEAD_SIZE as isize,
        )
        .await;
    if matches!(head, Err(bbsweb_bbs::Error::NotFound))
        && let Some(old) = filename.strip_suffix(".000")
    {
        let old = old.to_owned();
        head = shared
            .bbs
            .get_article_select(&brd_ref, SelectMethod::Head, &old, "", 0, HEAD_SIZE as isize)
            .await;
        if head.is_ok() {
            filename = old;
        }
    }
    let mut head = match head {
        Ok(part) => part,
        // Cache the miss as an invalid entity to absorb repeated lookups.
        Err(bbsweb_bbs::Error::NotFound) => return Ok((Article::default(), invalid_ttl(ttl))),
        Err(err) => return Err(err.into()),
    };

    // We don't want head and tail to have duplicate content.
    if head.file_size > HEAD_SIZE && head.file_size <= HEAD_SIZE + TAIL_SIZE {
        head = shared
            .bbs
            .get_article_select(
                &brd_ref,
                SelectMethod::Part,
                &filename,
                "",
                0,
                head.file_size as isize,
            )
            .await?;
    }

    if head.content.is_empty() {
        return Ok((Article::default(), invalid_ttl(ttl)));
    }

    let ctx = shared.render_context(&r.brd.brd_name);

    let mut article = Article {
        is_partial: head.length < head.file_size,
        is_truncated: head.length < head.file_size,
        ..Article::default()
    };

    if article.is_partial {
        // Fetch and render the tail with the article header suppressed.
        let tail = shared
            .bbs
            .get_article_select(
                &brd_ref,
                SelectMethod::Tail,
                &filename,
                "",
                -(TAIL_SIZE as isize),
                TAIL_SIZE as isize,
            )
            .await?;
        if !tail.content.is_empty() {
            let rendered = Render::new(&tail.content)
                .with_context(ctx.clone())
                .without_article_header()
                .render();
            article.content_tail_html = rendered.html;
        }
        article.cache_key = tail.cache_key;
        article.next_offset =
            tail.file_size.saturating_sub(TAIL_SIZE) + tail.offset + tail.length;
    } else {
        article.cache_key = head.cache_key.clone();
        article.next_offset = head.length;
    }

    let rendered = Render::new(&head.content).with_context(ctx).render();
    article.parsed_title = rendered.parsed_title;
    article.preview_content = rendered.preview_content;
    article.content_html = rendered.html;
    article.is_valid = true;

    if article.content_html.len() > TRUNCATE_SIZE {
        warn!(
            "large rendered article: {}/{}: {} bytes",
            r.brd.brd_name,
            filename,
            article.content_html.len()
        );
    }

    Ok((article, ttl))
}

async fn generate_article_part(
    shared: Arc<Shared>,
    r: ArticlePartRequest,
) -> Result<(ArticlePart, Duration)> {
    let ttl = shared.config.article_part_ttl();

    let part = match shared
        .bbs
        .get_article_select(
            &r.brd.r#ref(),
            SelectMethod::Head,
            &r.filename,
            &r.cache_key,
            r.offset as isize,
            -1,
        )
        .await
    {
        Ok(part) => part,
        // A vanished article polls as an invalid (cached) result.
        Err(bbsweb_bbs::Error::NotFound) => {
            return Ok((ArticlePart::default(), invalid_ttl(ttl)));
        }
        Err(err) => return Err(err.into()),
    };

    let mut result = ArticlePart {
        is_valid: true,
        cache_key: part.cache_key.clone(),
        next_offset: r.offset + part.offset + part.length,
        ..ArticlePart::default()
    };

    if !part.content.is_empty() {
        let rendered = Render::new(&part.content)
            .with_context(shared.render_context(&r.brd.brd_name))
            .without_article_header()
            .render();
        result.content_html = rendered.html;
    }

    Ok((result, ttl))
}

async fn generate_bbs_index(
    shared: Arc<Shared>,
    r: BbsIndexRequest,
) -> Result<(BbsIndex, Duration)> {
    let ttl = shared.config.bbs_index_ttl();
    let brd_ref = r.brd.r#ref();

    let mut paging = Paging::new(ENTRY_PER_PAGE, r.brd.num_posts);
    let mut page = r.page;
    if page == 0 {
        page = paging.last_page_no();
    }
    paging
        .set_page_no(page)
        .map_err(|err| Error::NotFound(err.to_string()))?;

    let mut index = BbsIndex {
        board: r.brd.clone(),
        is_valid: true,
        ..BbsIndex::default()
    };

    index.articles = shared
        .bbs
        .get_article_list(&brd_ref, paging.cursor() as isize, ENTRY_PER_PAGE)
        .await?;

    // Fetch bottoms when at the last page.
    if page == paging.last_page_no() {
        index.bottoms = shared.bbs.get_bottom_list(&brd_ref).await?;
    }

    index.total_page = paging.last_page_no();
    index.has_prev_page = page > 1;
    index.has_next_page = page < paging.last_page_no();
    if index.has_prev_page {
        index.prev_page = page - 1;
    }
    if index.has_next_page {
        index.next_page = page + 1;
    }

    Ok((index, ttl))
}

async fn generate_bbs_search(
    shared: Arc<Shared>,
    r: BbsSearchRequest,
) -> Result<(BbsIndex, Duration)> {
    let ttl = shared.config.search_ttl();
    let page = r.page.max(1);
    let offset = -((ENTRY_PER_PAGE * page) as isize);

    let mut index = BbsIndex {
        board: r.brd.clone(),
        query: r.query.clone(),
        is_valid: true,
        ..BbsIndex::default()
    };

    let (mut articles, total_posts) = shared
        .bbs
        .search(&r.brd.r#ref(), &r.predicates, offset, ENTRY_PER_PAGE)
        .await?;

    let paging = Paging::new(ENTRY_PER_PAGE, total_posts);
    let last_page = paging.last_page_no();
    if page > last_page {
        articles.clear();
        index.is_valid = false;
    } else if page == last_page {
        // The oldest page underfills: its negative offset clamps at the
        // start and pulls in entries belonging to the next newer page.
        let n = total_posts % ENTRY_PER_PAGE;
        if n > 0 && n < articles.len() {
            articles.truncate(n);
        }
    }

    // Show the page newest first.
    articles.reverse();
    index.articles = articles;

    // Page links run newest-first as well.
    index.total_page = last_page;
    index.has_next_page = page > 1;
    index.has_prev_page = page < last_page;
    if index.has_next_page {
        index.next_page = page - 1;
    }
    if index.has_prev_page {
        index.prev_page = page + 1;
    }

    Ok((index, ttl))
}

async fn generate_board_feed(
    shared: Arc<Shared>,
    r: BoardFeedRequest,
) -> Result<(BoardFeed, Duration)> {
    let ttl = shared.config.feed_ttl();

    let articles = shared
        .bbs
        .get_article_list(&r.brd.r#ref(), -(ENTRY_PER_PAGE as isize), ENTRY_PER_PAGE)
        .await?;

    let mut posts = Vec::with_capacity(articles.len());
    for article in articles {
        // Snippets degrade to empty on error; the feed itself survives.
        let snippet = article_snippet(&shared, &r.brd, &article.file_name)
            .await
            .unwrap_or_default();
        posts.push(PostEntry { article, snippet });
    }

    Ok((
        BoardFeed {
            board: r.brd,
            posts,
            is_valid: true,
        },
        ttl,
    ))
}

async fn article_snippet(shared: &Shared, brd: &Board, filename: &str) -> Result<String> {
    let part = shared
        .bbs
        .get_article_select(
            &brd.r#ref(),
            SelectMethod::Head,
            filename,
            "",
            0,
            SNIPPET_HEAD_SIZE as isize,
        )
        .await?;
    if part.content.is_empty() {
        return Err(bbsweb_bbs::Error::NotFound.into());
    }
    Ok(Render::new(&part.content).render().preview_content)
}
