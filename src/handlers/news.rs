use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::error::AppError;
use crate::services::news::Headlines;
use crate::services::{NewsCategory, NewsQuery};
use crate::state::AppState;

/// 1ページあたりのデフォルト記事数
const DEFAULT_PAGE_SIZE: u32 = 15;
/// NewsAPI の pageSize 上限
const MAX_PAGE_SIZE: u32 = 100;

/// ニュース取得のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct NewsParams {
    /// 検索語（指定時はカテゴリより優先）
    pub q: Option<String>,
    /// カテゴリ（未指定時は general）
    pub category: Option<NewsCategory>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// ニュース取得ハンドラー
///
/// GET /api/news?category=technology&page=1&page_size=15
///
/// NewsAPI top-headlines を1ページ分プロキシして返す。
/// レスポンスは camelCase (`totalResults`, `articles`)。
pub async fn get_news(
    State(state): State<AppState>,
    Query(params): Query<NewsParams>,
) -> Result<Json<Headlines>, AppError> {
    let query = validate_news_params(&params)?;

    let headlines = state
        .news_client
        .top_headlines(&query, params.page, params.page_size)
        .await?;

    Ok(Json(headlines))
}

/// クエリパラメータのバリデーションと取得条件への変換
///
/// 空白のみの検索語は未指定として扱う。
fn validate_news_params(params: &NewsParams) -> Result<NewsQuery, AppError> {
    if params.page < 1 {
        return Err(AppError::Validation(
            "Page must be 1 or greater".to_string(),
        ));
    }

    if params.page_size < 1 || params.page_size > MAX_PAGE_SIZE {
        return Err(AppError::Validation(
            "Page size must be between 1 and 100".to_string(),
        ));
    }

    let query = match params.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => NewsQuery::Search(q.to_string()),
        _ => match params.category {
            Some(category) => NewsQuery::Category(category),
            None => NewsQuery::default(),
        },
    };

    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(
        q: Option<&str>,
        category: Option<NewsCategory>,
        page: u32,
        page_size: u32,
    ) -> NewsParams {
        NewsParams {
            q: q.map(str::to_string),
            category,
            page,
            page_size,
        }
    }

    #[test]
    fn test_validate_defaults_to_general_category() {
        let query = validate_news_params(&params(None, None, 1, 15)).unwrap();
        assert_eq!(query, NewsQuery::Category(NewsCategory::General));
    }

    #[test]
    fn test_validate_category() {
        let query =
            validate_news_params(&params(None, Some(NewsCategory::Sports), 1, 15)).unwrap();
        assert_eq!(query, NewsQuery::Category(NewsCategory::Sports));
    }

    /// 検索語はカテゴリより優先される
    #[test]
    fn test_validate_search_wins_over_category() {
        let query =
            validate_news_params(&params(Some("rust"), Some(NewsCategory::Sports), 1, 15))
                .unwrap();
        assert_eq!(query, NewsQuery::Search("rust".to_string()));
    }

    /// 空白のみの検索語は未指定として扱う
    #[test]
    fn test_validate_blank_search_falls_back() {
        let query =
            validate_news_params(&params(Some("   "), Some(NewsCategory::Health), 1, 15)).unwrap();
        assert_eq!(query, NewsQuery::Category(NewsCategory::Health));
    }

    #[test]
    fn test_validate_rejects_page_zero() {
        let result = validate_news_params(&params(None, None, 0, 15));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_page_size_out_of_range() {
        assert!(validate_news_params(&params(None, None, 1, 0)).is_err());
        assert!(validate_news_params(&params(None, None, 1, 101)).is_err());
        assert!(validate_news_params(&params(None, None, 1, 100)).is_ok());
    }
}
