use axum::{Json, extract::State};
use serde::Deserialize;

use crate::error::AppError;
use crate::handlers::otp::MessageResponse;
use crate::services::OtpService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String, // SecretBox不要（Deserialize後すぐハッシュ化）
}

/// パスワードリセットハンドラー
///
/// POST /api/auth/reset-password
///
/// OTPコードが一致すれば新パスワードを保存し、チャレンジを消化する。
///
/// # Security
/// - OTPコード・新パスワードはログに出力しない
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    validate_reset_password_request(&request)?;

    let otp_service = OtpService::new(
        state.user_repo.clone(),
        state.email_service.clone(),
        state.config.clone(),
    );
    otp_service
        .reset_password(&request.email, &request.otp, &request.new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password reset successful".to_string(),
    }))
}

/// リセットリクエストのバリデーション
///
/// 新パスワードはサインアップ時と同じ長さ要件で再検証する
fn validate_reset_password_request(request: &ResetPasswordRequest) -> Result<(), AppError> {
    if request.email.trim().is_empty()
        || request.otp.trim().is_empty()
        || request.new_password.is_empty()
    {
        return Err(AppError::Validation("Missing required fields".to_string()));
    }

    if request.new_password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, otp: &str, new_password: &str) -> ResetPasswordRequest {
        ResetPasswordRequest {
            email: email.to_string(),
            otp: otp.to_string(),
            new_password: new_password.to_string(),
        }
    }

    #[test]
    fn test_validate_missing_fields() {
        assert!(validate_reset_password_request(&request("", "123456", "password123")).is_err());
        assert!(
            validate_reset_password_request(&request("test@example.com", "", "password123"))
                .is_err()
        );
        assert!(
            validate_reset_password_request(&request("test@example.com", "123456", "")).is_err()
        );
    }

    #[test]
    fn test_validate_short_new_password() {
        let result = validate_reset_password_request(&request("test@example.com", "123456", "short"));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_valid_request() {
        let result =
            validate_reset_password_request(&request("test@example.com", "123456", "password123"));
        assert!(result.is_ok());
    }

    /// リクエストボディは camelCase (newPassword) を受け付ける
    #[test]
    fn test_deserialize_camel_case_body() {
        let json = r#"{"email":"test@example.com","otp":"123456","newPassword":"password123"}"#;
        let request: ResetPasswordRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.new_password, "password123");
    }
}
