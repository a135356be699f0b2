use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::UserSummary;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// ログインリクエスト
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// ユーザーのメールアドレス
    pub email: String,
    /// ユーザーのパスワード
    pub password: String,
}

/// ログインレスポンス
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserSummary,
}

/// ログインハンドラー
///
/// POST /api/auth/login
///
/// 処理フロー:
/// 1. リクエストバリデーション
/// 2. ユーザー認証（DB照合）
/// 3. ユーザー情報を返却（セッション発行はフロントエンド側の責務）
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    // 1. リクエストバリデーション
    validate_login_request(&request)?;

    // 2. ユーザー認証（DB照合）
    let auth_service = AuthService::new(state.user_repo.clone());
    let user = auth_service
        .authenticate(&request.email, &request.password)
        .await?;

    // 3. ユーザー情報を返却
    Ok(Json(LoginResponse { user: user.into() }))
}

/// ログインリクエストのバリデーション
///
/// パスワード長はここでは検証しない（照合失敗として扱う）
fn validate_login_request(request: &LoginRequest) -> Result<(), AppError> {
    // email: 必須、メール形式
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }

    // 簡易的なメール形式チェック（@ が含まれているか）
    if !request.email.contains('@') {
        return Err(AppError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }

    // password: 必須
    if request.password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }

    Ok(())
}
