use std::collections::HashMap;
use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::UserRepository;
use crate::services::{EmailService, NewsClient, OAuthService, ProviderKind};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL コネクションプール
    pub db_pool: PgPool,
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// ユーザーリポジトリ
    pub user_repo: UserRepository,
    /// メールサービス
    pub email_service: EmailService,
    /// NewsAPI クライアント
    pub news_client: NewsClient,
    /// 設定済みプロバイダーの OAuth サービス
    oauth_services: HashMap<ProviderKind, OAuthService>,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(db_pool: PgPool, config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);
        let user_repo = UserRepository::new(db_pool.clone());
        let email_service = EmailService::new(config.clone());
        let news_client = NewsClient::new(
            config.news_api_base_url.clone(),
            config.news_api_key.expose_secret().clone(),
        );

        // client_id / client_secret / redirect_uri が揃ったプロバイダーのみ初期化
        let mut oauth_services = HashMap::new();
        for provider in ProviderKind::ALL {
            match provider_credentials(&config, provider) {
                Some((client_id, client_secret, redirect_uri)) => {
                    tracing::info!(provider = %provider, "OAuth サービスを初期化");
                    let service = OAuthService::new(
                        provider,
                        client_id,
                        client_secret,
                        redirect_uri,
                        config.oauth_state_secret.expose_secret(),
                    )?;
                    oauth_services.insert(provider, service);
                }
                None => {
                    tracing::info!(provider = %provider, "OAuth 未設定（スキップ）");
                }
            }
        }

        Ok(Self {
            db_pool,
            config,
            user_repo,
            email_service,
            news_client,
            oauth_services,
        })
    }

    /// 指定プロバイダーの OAuth サービスを返す（未設定なら None）
    pub fn oauth_service(&self, provider: ProviderKind) -> Option<&OAuthService> {
        self.oauth_services.get(&provider)
    }
}

/// 設定からプロバイダーごとの認証情報を取り出す
///
/// 3項目すべてが設定されている場合のみ Some を返す。
fn provider_credentials(
    config: &Config,
    provider: ProviderKind,
) -> Option<(String, String, String)> {
    let (client_id, client_secret, redirect_uri) = match provider {
        ProviderKind::Google => (
            &config.google_client_id,
            &config.google_client_secret,
            &config.google_redirect_uri,
        ),
        ProviderKind::Facebook => (
            &config.facebook_client_id,
            &config.facebook_client_secret,
            &config.facebook_redirect_uri,
        ),
        ProviderKind::Github => (
            &config.github_client_id,
            &config.github_client_secret,
            &config.github_redirect_uri,
        ),
        ProviderKind::Linkedin => (
            &config.linkedin_client_id,
            &config.linkedin_client_secret,
            &config.linkedin_redirect_uri,
        ),
    };

    match (client_id, client_secret, redirect_uri) {
        (Some(id), Some(secret), Some(uri)) => {
            Some((id.clone(), secret.expose_secret().clone(), uri.clone()))
        }
        _ => None,
    }
}
