use std::sync::Arc;

use rand::Rng;
use time::{Duration, OffsetDateTime};

use crate::config::Config;
use crate::error::AppError;
use crate::models::User;
use crate::repositories::UserRepository;
use crate::services::{EmailService, auth};

/// OTPコードの桁数
pub const OTP_LENGTH: usize = 6;

/// 数字のみのOTPコードを生成
pub fn generate_otp(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10)))
        .collect()
}

/// 保存済みチャレンジに対してOTPコードを照合
///
/// チェック順序: チャレンジ不在 → 期限切れ → コード不一致。
/// 期限は `now > expires_at` で判定する（expires_at ちょうどは有効）。
pub fn check_challenge(user: &User, code: &str, now: OffsetDateTime) -> Result<(), AppError> {
    let challenge = user.otp_challenge().ok_or(AppError::OtpMissing)?;

    if now > challenge.expires_at {
        return Err(AppError::OtpExpired);
    }

    if !auth::verify_password(code, challenge.otp_hash)? {
        return Err(AppError::OtpInvalid);
    }

    Ok(())
}

/// OTPサービス
///
/// メール検証とパスワードリセットで共有される単一チャレンジの
/// 発行・照合・消化を担う。
#[derive(Clone)]
pub struct OtpService {
    user_repo: UserRepository,
    email_service: EmailService,
    config: Arc<Config>,
}

impl OtpService {
    /// 新しい OtpService を作成
    pub fn new(user_repo: UserRepository, email_service: EmailService, config: Arc<Config>) -> Self {
        Self {
            user_repo,
            email_service,
            config,
        }
    }

    /// OTPを発行してメール送信
    ///
    /// 既存の未消化チャレンジは新しいチャレンジで上書きされる。
    ///
    /// # Security
    /// - OTPコード（平文）はログに出力しない
    ///
    /// # Note
    /// メール送信失敗時もチャレンジはロールバックしない。
    /// ユーザーの再送リクエストで上書きされる。
    pub async fn send_otp(&self, email: &str) -> Result<(), AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let otp = generate_otp(OTP_LENGTH);
        let otp_hash = auth::hash_password(&otp)?;

        let expires_at = OffsetDateTime::now_utc() + Duration::seconds(self.config.otp_ttl_secs);

        self.user_repo
            .set_otp_challenge(user.id, &otp_hash, expires_at)
            .await?;

        self.email_service
            .send_otp_email(&user.email, &user.name, &otp)
            .await?;

        tracing::info!(email = %email, "OTP発行完了");

        Ok(())
    }

    /// OTPを照合してメールアドレスを検証済みにする
    ///
    /// 照合成功時、検証フラグ更新とチャレンジ消化を同一UPDATEで行う。
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<(), AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        check_challenge(&user, code, OffsetDateTime::now_utc())?;

        // 照合と消化の間に並行リクエストがチャレンジを消化した場合は 0 行更新になる
        let updated = self.user_repo.mark_verified_and_clear_otp(user.id).await?;
        if updated == 0 {
            tracing::warn!(user_id = %user.id, "OTP消化競合: チャレンジは消化済み");
            return Err(AppError::OtpMissing);
        }

        tracing::info!(user_id = %user.id, "メールアドレス検証完了");

        Ok(())
    }

    /// OTPを照合してパスワードを再設定
    ///
    /// # Security
    /// - 新パスワードはログに出力しない
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        check_challenge(&user, code, OffsetDateTime::now_utc())?;

        let password_hash = auth::hash_password(new_password)?;

        let updated = self
            .user_repo
            .update_password_and_clear_otp(user.id, &password_hash)
            .await?;
        if updated == 0 {
            tracing::warn!(user_id = %user.id, "OTP消化競合: チャレンジは消化済み");
            return Err(AppError::OtpMissing);
        }

        tracing::info!(user_id = %user.id, "パスワードリセット完了");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::PROVIDER_CREDENTIALS;

    fn test_user(otp_hash: Option<String>, otp_expiry: Option<OffsetDateTime>) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            password_hash: None,
            provider: PROVIDER_CREDENTIALS.to_string(),
            is_verified: false,
            otp_hash,
            otp_expiry,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_generate_otp_length_and_digits() {
        for _ in 0..100 {
            let otp = generate_otp(OTP_LENGTH);
            assert_eq!(otp.len(), OTP_LENGTH);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_check_challenge_fresh_code_verifies() {
        let now = OffsetDateTime::now_utc();
        let otp_hash = auth::hash_password("123456").unwrap();
        let user = test_user(Some(otp_hash), Some(now + Duration::minutes(10)));

        assert!(check_challenge(&user, "123456", now).is_ok());
    }

    #[test]
    fn test_check_challenge_missing() {
        let now = OffsetDateTime::now_utc();
        let user = test_user(None, None);

        let result = check_challenge(&user, "123456", now);
        assert!(matches!(result, Err(AppError::OtpMissing)));
    }

    #[test]
    fn test_check_challenge_expired() {
        let now = OffsetDateTime::now_utc();
        let otp_hash = auth::hash_password("123456").unwrap();
        let user = test_user(Some(otp_hash), Some(now - Duration::seconds(1)));

        let result = check_challenge(&user, "123456", now);
        assert!(matches!(result, Err(AppError::OtpExpired)));
    }

    /// 期限ちょうどのOTPは有効（期限切れ判定は now > expires_at）
    #[test]
    fn test_check_challenge_at_exact_expiry_still_valid() {
        let now = OffsetDateTime::now_utc();
        let otp_hash = auth::hash_password("123456").unwrap();
        let user = test_user(Some(otp_hash), Some(now));

        assert!(check_challenge(&user, "123456", now).is_ok());
    }

    #[test]
    fn test_check_challenge_wrong_code() {
        let now = OffsetDateTime::now_utc();
        let otp_hash = auth::hash_password("123456").unwrap();
        let user = test_user(Some(otp_hash), Some(now + Duration::minutes(10)));

        let result = check_challenge(&user, "654321", now);
        assert!(matches!(result, Err(AppError::OtpInvalid)));
    }

    /// 再発行で上書きされたチャレンジに対して旧コードは不一致になる
    #[test]
    fn test_check_challenge_reissue_invalidates_old_code() {
        let now = OffsetDateTime::now_utc();
        let new_hash = auth::hash_password("654321").unwrap();
        let user = test_user(Some(new_hash), Some(now + Duration::minutes(10)));

        let result = check_challenge(&user, "123456", now);
        assert!(matches!(result, Err(AppError::OtpInvalid)));

        assert!(check_challenge(&user, "654321", now).is_ok());
    }

    /// 期限チェックはコード照合より先に行われる
    #[test]
    fn test_check_challenge_expiry_checked_before_code() {
        let now = OffsetDateTime::now_utc();
        let otp_hash = auth::hash_password("123456").unwrap();
        let user = test_user(Some(otp_hash), Some(now - Duration::minutes(1)));

        // 期限切れなら正しいコードでも OtpExpired
        let result = check_challenge(&user, "123456", now);
        assert!(matches!(result, Err(AppError::OtpExpired)));
    }
}
