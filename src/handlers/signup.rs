use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::UserSummary;
use crate::services::auth::hash_password;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String, // SecretBox不要（Deserialize後すぐハッシュ化）
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub user: UserSummary,
}

/// サインアップハンドラー
///
/// POST /api/auth/signup
///
/// # Security
/// - パスワードはログに出力しない
/// - パスワードは即座にハッシュ化
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    // バリデーション
    validate_signup_request(&request)?;

    // パスワードハッシュ化
    let password_hash = hash_password(&request.password)?;

    // ユーザー作成
    let user = state
        .user_repo
        .create_user(&request.name, &request.email, &password_hash)
        .await
        .map_err(|e| {
            // UNIQUE制約違反チェック
            if let sqlx::Error::Database(db_err) = &e
                && db_err.constraint() == Some("users_email_key")
            {
                return AppError::EmailAlreadyExists;
            }
            AppError::Database(e)
        })?;

    tracing::info!(email = %request.email, "ユーザー登録成功");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created successfully".to_string(),
            user: user.into(),
        }),
    ))
}

/// サインアップリクエストのバリデーション
fn validate_signup_request(request: &SignupRequest) -> Result<(), AppError> {
    // name / email / password: 必須
    if request.name.trim().is_empty()
        || request.email.trim().is_empty()
        || request.password.is_empty()
    {
        return Err(AppError::Validation("Missing required fields".to_string()));
    }

    // 簡易的なメール形式チェック（@ が含まれているか）
    if !request.email.contains('@') {
        return Err(AppError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }

    // password: 8文字以上
    if request.password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_validate_missing_name() {
        let result = validate_signup_request(&request("", "test@example.com", "password123"));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_empty_email() {
        let result = validate_signup_request(&request("Test", "", "password123"));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_invalid_email() {
        let result = validate_signup_request(&request("Test", "invalid-email", "password123"));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_short_password() {
        let result = validate_signup_request(&request("Test", "test@example.com", "short"));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_valid_request() {
        let result =
            validate_signup_request(&request("Test", "test@example.com", "password123"));
        assert!(result.is_ok());
    }
}
