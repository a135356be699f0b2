use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::OtpService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

/// メッセージのみのレスポンス
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// OTP発行ハンドラー
///
/// POST /api/auth/send-otp
///
/// 登録済みメールアドレスに6桁のOTPコードを送信する。
/// 既存の未消化チャレンジは上書きされる。
///
/// # Security
/// - OTPコード（平文）はログに出力しない
pub async fn send_otp(
    State(state): State<AppState>,
    Json(request): Json<SendOtpRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    validate_send_otp_request(&request)?;

    let otp_service = OtpService::new(
        state.user_repo.clone(),
        state.email_service.clone(),
        state.config.clone(),
    );
    otp_service.send_otp(&request.email).await?;

    Ok(Json(MessageResponse {
        message: "OTP sent successfully".to_string(),
    }))
}

/// OTP照合ハンドラー
///
/// POST /api/auth/verify-otp
///
/// コードが一致すればメールアドレスを検証済みにし、チャレンジを消化する。
/// コードの形式チェックは行わない（照合失敗として扱う）。
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    validate_verify_otp_request(&request)?;

    let otp_service = OtpService::new(
        state.user_repo.clone(),
        state.email_service.clone(),
        state.config.clone(),
    );
    otp_service
        .verify_email(&request.email, &request.otp)
        .await?;

    Ok(Json(MessageResponse {
        message: "Email verified successfully".to_string(),
    }))
}

/// OTP発行リクエストのバリデーション
fn validate_send_otp_request(request: &SendOtpRequest) -> Result<(), AppError> {
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }

    if !request.email.contains('@') {
        return Err(AppError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }

    Ok(())
}

/// OTP照合リクエストのバリデーション
fn validate_verify_otp_request(request: &VerifyOtpRequest) -> Result<(), AppError> {
    if request.email.trim().is_empty() || request.otp.trim().is_empty() {
        return Err(AppError::Validation(
            "Email and OTP are required".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_send_otp_empty_email() {
        let request = SendOtpRequest {
            email: "".to_string(),
        };
        assert!(validate_send_otp_request(&request).is_err());
    }

    #[test]
    fn test_validate_send_otp_invalid_email() {
        let request = SendOtpRequest {
            email: "invalid-email".to_string(),
        };
        assert!(validate_send_otp_request(&request).is_err());
    }

    #[test]
    fn test_validate_send_otp_valid() {
        let request = SendOtpRequest {
            email: "test@example.com".to_string(),
        };
        assert!(validate_send_otp_request(&request).is_ok());
    }

    #[test]
    fn test_validate_verify_otp_missing_fields() {
        let request = VerifyOtpRequest {
            email: "test@example.com".to_string(),
            otp: "".to_string(),
        };
        assert!(validate_verify_otp_request(&request).is_err());

        let request = VerifyOtpRequest {
            email: "".to_string(),
            otp: "123456".to_string(),
        };
        assert!(validate_verify_otp_request(&request).is_err());
    }

    #[test]
    fn test_validate_verify_otp_valid() {
        let request = VerifyOtpRequest {
            email: "test@example.com".to_string(),
            otp: "123456".to_string(),
        };
        assert!(validate_verify_otp_request(&request).is_ok());
    }
}
