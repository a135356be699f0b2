use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// NewsAPI top-headlines の対応カテゴリ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsCategory {
    Business,
    Entertainment,
    General,
    Health,
    Science,
    Sports,
    Technology,
}

impl NewsCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsCategory::Business => "business",
            NewsCategory::Entertainment => "entertainment",
            NewsCategory::General => "general",
            NewsCategory::Health => "health",
            NewsCategory::Science => "science",
            NewsCategory::Sports => "sports",
            NewsCategory::Technology => "technology",
        }
    }
}

impl std::fmt::Display for NewsCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 取得条件
///
/// 検索語とカテゴリは同時指定できない（検索語が優先される）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewsQuery {
    Category(NewsCategory),
    Search(String),
}

impl NewsQuery {
    /// NewsAPI のクエリパラメータ (key, value) へ変換
    fn to_param(&self) -> (&'static str, String) {
        match self {
            NewsQuery::Category(category) => ("category", category.as_str().to_string()),
            NewsQuery::Search(q) => ("q", q.clone()),
        }
    }
}

impl Default for NewsQuery {
    fn default() -> Self {
        NewsQuery::Category(NewsCategory::General)
    }
}

/// 記事の配信元
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSource {
    pub id: Option<String>,
    pub name: String,
}

/// NewsAPI の記事
///
/// publishedAt は NewsAPI の文字列表現のまま透過する
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub source: ArticleSource,
    pub author: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub url_to_image: Option<String>,
    pub published_at: String,
    pub content: Option<String>,
}

/// 1ページ分の取得結果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Headlines {
    pub total_results: u64,
    pub articles: Vec<Article>,
}

/// NewsAPI からの生レスポンス
///
/// エラー時は status = "error" と code / message が返る
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHeadlinesResponse {
    status: String,
    code: Option<String>,
    message: Option<String>,
    total_results: Option<u64>,
    articles: Option<Vec<Article>>,
}

/// status 判定とフィールドの正規化
///
/// 欠損した totalResults / articles は 0 / 空配列として扱う
fn parse_headlines(raw: RawHeadlinesResponse) -> Result<Headlines, AppError> {
    if raw.status != "ok" {
        let code = raw.code.unwrap_or_else(|| "unknown".to_string());
        let message = raw.message.unwrap_or_default();
        return Err(AppError::NewsApiRejected(format!("{code}: {message}")));
    }

    Ok(Headlines {
        total_results: raw.total_results.unwrap_or(0),
        articles: raw.articles.unwrap_or_default(),
    })
}

/// NewsAPI クライアント
///
/// # Security
/// APIキーは X-Api-Key ヘッダーで送信する（URLに含めない）。ログ出力禁止。
#[derive(Clone)]
pub struct NewsClient {
    client: reqwest::Client,
    base_url: String,
    /// APIキー（機密情報 - ログ出力禁止）
    api_key: Arc<String>,
}

impl NewsClient {
    /// 新しい NewsClient を作成
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key: Arc::new(api_key),
        }
    }

    /// top-headlines を1ページ取得
    ///
    /// # Arguments
    /// * `query` - カテゴリまたは検索語
    /// * `page` - 1始まりのページ番号
    /// * `page_size` - 1ページあたりの記事数
    pub async fn top_headlines(
        &self,
        query: &NewsQuery,
        page: u32,
        page_size: u32,
    ) -> Result<Headlines, AppError> {
        let url = format!("{}/top-headlines", self.base_url);
        let (param_key, param_value) = query.to_param();

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", self.api_key.as_str())
            .query(&[
                (param_key, param_value),
                ("page", page.to_string()),
                ("pageSize", page_size.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "NewsAPI エラーレスポンス");
            return Err(AppError::NewsApiRejected(format!("http status {}", status)));
        }

        let raw: RawHeadlinesResponse = response.json().await.map_err(|e| {
            tracing::error!(error = ?e, "NewsAPI レスポンスのパースエラー");
            AppError::NewsApiRejected("invalid response format".to_string())
        })?;

        let headlines = parse_headlines(raw)?;

        tracing::debug!(
            page = page,
            count = headlines.articles.len(),
            total = headlines.total_results,
            "NewsAPI top-headlines 取得成功"
        );

        Ok(headlines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_news_category_as_str() {
        assert_eq!(NewsCategory::Business.as_str(), "business");
        assert_eq!(NewsCategory::Technology.as_str(), "technology");
    }

    #[test]
    fn test_news_category_deserialize() {
        let category: NewsCategory = serde_json::from_str("\"health\"").unwrap();
        assert_eq!(category, NewsCategory::Health);

        let result = serde_json::from_str::<NewsCategory>("\"politics\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_news_query_to_param() {
        let (key, value) = NewsQuery::Category(NewsCategory::Sports).to_param();
        assert_eq!(key, "category");
        assert_eq!(value, "sports");

        let (key, value) = NewsQuery::Search("rust".to_string()).to_param();
        assert_eq!(key, "q");
        assert_eq!(value, "rust");
    }

    #[test]
    fn test_default_query_is_general_category() {
        assert_eq!(
            NewsQuery::default(),
            NewsQuery::Category(NewsCategory::General)
        );
    }

    #[test]
    fn test_parse_headlines_success_response() {
        let json = r#"{
            "status": "ok",
            "totalResults": 42,
            "articles": [
                {
                    "source": { "id": "cnn", "name": "CNN" },
                    "author": "Jane Doe",
                    "title": "Breaking news",
                    "description": "Something happened",
                    "url": "https://example.com/article",
                    "urlToImage": "https://example.com/image.jpg",
                    "publishedAt": "2025-06-01T12:00:00Z",
                    "content": "Full content"
                },
                {
                    "source": { "id": null, "name": "Reuters" },
                    "author": null,
                    "title": "Another story",
                    "description": null,
                    "url": "https://example.com/other",
                    "urlToImage": null,
                    "publishedAt": "2025-06-01T13:00:00Z",
                    "content": null
                }
            ]
        }"#;

        let raw: RawHeadlinesResponse = serde_json::from_str(json).unwrap();
        let headlines = parse_headlines(raw).unwrap();

        assert_eq!(headlines.total_results, 42);
        assert_eq!(headlines.articles.len(), 2);
        assert_eq!(headlines.articles[0].source.id.as_deref(), Some("cnn"));
        assert_eq!(headlines.articles[0].author.as_deref(), Some("Jane Doe"));
        assert!(headlines.articles[1].author.is_none());
        assert!(headlines.articles[1].url_to_image.is_none());
    }

    #[test]
    fn test_parse_headlines_error_response() {
        let json = r#"{
            "status": "error",
            "code": "apiKeyInvalid",
            "message": "Your API key is invalid"
        }"#;

        let raw: RawHeadlinesResponse = serde_json::from_str(json).unwrap();
        let result = parse_headlines(raw);

        match result {
            Err(AppError::NewsApiRejected(detail)) => {
                assert!(detail.contains("apiKeyInvalid"));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    /// 欠損フィールドは 0 / 空配列に正規化される
    #[test]
    fn test_parse_headlines_missing_fields() {
        let json = r#"{ "status": "ok" }"#;

        let raw: RawHeadlinesResponse = serde_json::from_str(json).unwrap();
        let headlines = parse_headlines(raw).unwrap();

        assert_eq!(headlines.total_results, 0);
        assert!(headlines.articles.is_empty());
    }

    #[test]
    fn test_headlines_serialize_camel_case() {
        let headlines = Headlines {
            total_results: 7,
            articles: vec![],
        };

        let value = serde_json::to_value(&headlines).unwrap();
        assert_eq!(value["totalResults"], 7);
        assert!(value.get("total_results").is_none());
    }
}
