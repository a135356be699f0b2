//! OAuth ソーシャルログインハンドラー
//!
//! Google / Facebook / GitHub / LinkedIn のソーシャルログイン処理を提供する。
//! プロバイダーはパスパラメータで指定し、設定済みのもののみ受け付ける。
//!
//! # Security
//! - state パラメータは AES-256-GCM で暗号化され、ログイン後のリダイレクト先を含む
//! - リダイレクト先は相対パスのみ許可（オープンリダイレクト対策）
//! - access_token はログに出力しない

use axum::{
    Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::oauth::OAuthUserInfo;
use crate::services::{OAuthService, ProviderKind};
use crate::state::AppState;

/// OAuth 認証開始時のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct OAuthBeginQuery {
    /// ログイン完了後のリダイレクト先（相対パスのみ）
    pub next: Option<String>,
}

/// OAuth コールバック時のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    /// OAuth プロバイダーから受け取った認可コード
    pub code: String,
    /// 暗号化された state（リダイレクト先パスを含む）
    pub state: String,
}

/// OAuth 認証 URL レスポンス
#[derive(Debug, Serialize)]
pub struct OAuthAuthResponse {
    /// OAuth 認可 URL（フロントエンドでリダイレクトに使用）
    pub auth_url: String,
}

/// OAuth 認証 URL を生成
///
/// GET /api/oauth/{provider}
///
/// フロントエンドはこの URL にユーザーをリダイレクトする。
/// `next` で指定されたログイン後のリダイレクト先を検証し、
/// 暗号化して state に埋め込む。
pub async fn oauth_begin(
    State(state): State<AppState>,
    Path(provider): Path<ProviderKind>,
    Query(query): Query<OAuthBeginQuery>,
) -> Result<Json<OAuthAuthResponse>, AppError> {
    tracing::info!(provider = %provider, "OAuth 認証開始");

    let oauth_service = configured_service(&state, provider)?;

    let next_path = resolve_next_path(query.next.as_deref(), &state.config.post_login_redirect)?;
    let auth_url = oauth_service.generate_auth_url(&next_path)?;

    tracing::debug!(provider = %provider, "OAuth 認可 URL 生成成功");
    Ok(Json(OAuthAuthResponse { auth_url }))
}

/// OAuth コールバック処理
///
/// GET /api/oauth/{provider}/callback
///
/// # 処理フロー
/// 1. state を復号してリダイレクト先パスを復元
/// 2. code でトークン交換
/// 3. access_token でユーザー情報取得
/// 4. email で users 検索
///    - 見つかれば: そのままログイン（レコードは変更しない）
///    - 見つからなければ: パスワードなし・provider タグ付きでユーザー作成
/// 5. 復元したパスへ 303 リダイレクト
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<ProviderKind>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<Redirect, AppError> {
    tracing::info!(provider = %provider, "OAuth コールバック受信");

    let oauth_service = configured_service(&state, provider)?;

    // 1. state を復号してリダイレクト先を復元
    let next_path = oauth_service.decode_state(&query.state)?;

    // 2. code でトークン交換
    let token_response = oauth_service.exchange_code(&query.code).await?;
    // Note: access_token はログに出力しない

    // 3. access_token でユーザー情報取得
    let user_info = oauth_service
        .get_user_info(&token_response.access_token)
        .await?;
    tracing::info!(provider = %provider, "OAuth ユーザー情報取得成功");

    // 4. ユーザー検索・作成
    provision_user(&state, provider, &user_info).await?;

    // 5. 復元したパスへリダイレクト
    Ok(Redirect::to(&next_path))
}

/// 設定済みの OAuth サービスを取得
fn configured_service(
    state: &AppState,
    provider: ProviderKind,
) -> Result<&OAuthService, AppError> {
    state.oauth_service(provider).ok_or_else(|| {
        tracing::warn!(provider = %provider, "OAuth が設定されていません");
        AppError::OAuthError(format!("{provider} OAuth is not configured"))
    })
}

/// ログイン後のリダイレクト先を検証
///
/// 相対パス（`/` 始まり、`//` 始まりは除く）のみ許可する。
/// 未指定の場合は設定のデフォルトパスを使う。
fn resolve_next_path(next: Option<&str>, default_path: &str) -> Result<String, AppError> {
    match next {
        None => Ok(default_path.to_string()),
        Some(path) if path.starts_with('/') && !path.starts_with("//") => Ok(path.to_string()),
        Some(_) => Err(AppError::Validation("Invalid redirect path".to_string())),
    }
}

/// OAuth ログインユーザーの検索・作成
///
/// email で既存ユーザーを検索し、見つからなければパスワードなしで作成する。
/// 既存ユーザーのレコードは変更しない（provider タグも初回登録時のまま）。
async fn provision_user(
    state: &AppState,
    provider: ProviderKind,
    user_info: &OAuthUserInfo,
) -> Result<(), AppError> {
    match state.user_repo.find_by_email(&user_info.email).await? {
        Some(user) => {
            tracing::info!(provider = %provider, user_id = %user.id, "既存ユーザーでログイン");
        }
        None => {
            let name = user_info
                .name
                .clone()
                .unwrap_or_else(|| user_info.email.clone());
            let user = state
                .user_repo
                .create_social_user(&name, &user_info.email, provider.as_str())
                .await?;
            tracing::info!(provider = %provider, user_id = %user.id, "新規ソーシャルユーザーを作成");
        }
    }

    Ok(())
}
