use crate::error::AppError;
use crate::services::news::{Article, Headlines, NewsClient, NewsQuery};

/// ページネーション付きフィードアキュムレータ
///
/// 無限スクロールUIの裏側を担う: 取得済み記事を蓄積し、追加ロードの
/// 可否 (`has_more`) と実行中フラグ (`is_loading`) を管理する。
///
/// totalResults は固定値ではなくページ取得のたびに最新値で更新する。
/// NewsAPI 側で記事の増減があっても打ち切り判定が追従する。
#[derive(Debug, Clone)]
pub struct ArticleFeed {
    query: NewsQuery,
    page_size: u32,
    articles: Vec<Article>,
    page: u32,
    total_results: u64,
    has_more: bool,
    is_loading: bool,
}

impl ArticleFeed {
    /// 1ページ目の取得結果からフィードを構築
    pub fn from_first_page(query: NewsQuery, page_size: u32, first: Headlines) -> Self {
        let has_more = (first.articles.len() as u64) < first.total_results;

        Self {
            query,
            page_size,
            articles: first.articles,
            page: 1,
            total_results: first.total_results,
            has_more,
            is_loading: false,
        }
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_results(&self) -> u64 {
        self.total_results
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// 次ページを取得して蓄積
    ///
    /// 実行中または打ち切り済みの場合は何もしない。取得エラー時は
    /// 蓄積状態を変更せず、実行中フラグのみ解除して呼び出し側へ返す。
    pub async fn load_more(&mut self, client: &NewsClient) -> Result<(), AppError> {
        if self.is_loading || !self.has_more {
            return Ok(());
        }

        self.is_loading = true;
        let result = client
            .top_headlines(&self.query, self.page + 1, self.page_size)
            .await;
        self.is_loading = false;

        let headlines = result?;
        self.apply_page(headlines);

        Ok(())
    }

    /// 取得済みページをフィードへ反映
    ///
    /// 空ページは打ち切りとして扱い、ページ番号は進めない。
    fn apply_page(&mut self, headlines: Headlines) {
        if headlines.articles.is_empty() {
            self.has_more = false;
            return;
        }

        self.articles.extend(headlines.articles);
        self.page += 1;
        self.total_results = headlines.total_results;
        self.has_more = (self.articles.len() as u64) < self.total_results;
    }
}
