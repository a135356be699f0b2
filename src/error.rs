use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("認証エラー")]
    Authentication,

    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),

    #[error("ユーザーが見つかりません")]
    UserNotFound,

    #[error("このメールアドレスは既に使用されています")]
    EmailAlreadyExists,

    #[error("OTPチャレンジが存在しません")]
    OtpMissing,

    #[error("OTPの有効期限が切れています")]
    OtpExpired,

    #[error("OTPが一致しません")]
    OtpInvalid,

    #[error("OTPメールの送信に失敗しました")]
    MailDispatch(#[source] anyhow::Error),

    #[error("ニュースAPIエラー")]
    NewsApi(#[from] reqwest::Error),

    #[error("ニュースAPIが異常レスポンスを返しました: {0}")]
    NewsApiRejected(String),

    #[error("OAuth認証エラー: {0}")]
    OAuthError(String),

    #[error("無効なstateパラメータ")]
    OAuthStateInvalid,

    #[error("OAuthプロバイダーエラー")]
    OAuthProviderError,
}

/// クライアント向けエラーボディ
///
/// 構造化エラーコードは公開しない。人間可読メッセージのみ（詳細はログ側に残す）。
#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Authentication => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Self::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
            Self::EmailAlreadyExists => (
                StatusCode::CONFLICT,
                "User already exists with this email".to_string(),
            ),
            Self::OtpMissing => (
                StatusCode::BAD_REQUEST,
                "No OTP found. Please request a new one.".to_string(),
            ),
            Self::OtpExpired => (
                StatusCode::BAD_REQUEST,
                "OTP has expired. Please request a new one.".to_string(),
            ),
            Self::OtpInvalid => (StatusCode::BAD_REQUEST, "Invalid OTP".to_string()),
            Self::MailDispatch(e) => {
                tracing::error!(error = ?e, "OTPメール送信エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to send OTP".to_string(),
                )
            }
            Self::NewsApi(e) => {
                tracing::error!(error = ?e, "ニュースAPI通信エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch news".to_string(),
                )
            }
            Self::NewsApiRejected(detail) => {
                tracing::error!(detail = %detail, "ニュースAPIエラーレスポンス");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch news".to_string(),
                )
            }
            Self::OAuthError(e) => {
                tracing::error!(error = %e, "OAuth認証エラー");
                (
                    StatusCode::UNAUTHORIZED,
                    "Authentication failed".to_string(),
                )
            }
            Self::OAuthStateInvalid => {
                tracing::warn!("無効なOAuth stateパラメータ（CSRF攻撃の可能性）");
                (StatusCode::BAD_REQUEST, "Invalid request".to_string())
            }
            Self::OAuthProviderError => (
                StatusCode::BAD_GATEWAY,
                "Failed to communicate with the login provider".to_string(),
            ),
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}
