use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{PROVIDER_CREDENTIALS, User};

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// メールアドレスでユーザーを検索
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, provider, is_verified,
                   otp_hash, otp_expiry, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// credentials ユーザーを作成
    ///
    /// # Errors
    /// - UNIQUE制約違反時: `sqlx::Error::Database` (constraint = "users_email_key")
    ///   呼び出し側で `AppError::EmailAlreadyExists` に変換すること
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, provider)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, provider, is_verified,
                      otp_hash, otp_expiry, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(PROVIDER_CREDENTIALS)
        .fetch_one(&self.pool)
        .await
    }

    /// ソーシャルログイン初回用ユーザーを作成（パスワードなし）
    ///
    /// provider タグにはログイン元プロバイダー名を記録する
    pub async fn create_social_user(
        &self,
        name: &str,
        email: &str,
        provider: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, provider)
            VALUES ($1, $2, NULL, $3)
            RETURNING id, name, email, password_hash, provider, is_verified,
                      otp_hash, otp_expiry, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(provider)
        .fetch_one(&self.pool)
        .await
    }

    /// OTPチャレンジを設定
    ///
    /// hash と expiry を常にペアで書き込む。既存の未消化チャレンジは
    /// 上書きされる（ユーザーごとに未消化チャレンジは常に1つ）。
    ///
    /// # Note
    /// otp_hash はログに出力しないこと
    pub async fn set_otp_challenge(
        &self,
        user_id: Uuid,
        otp_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET otp_hash = $2, otp_expiry = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(otp_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// メール検証成功: is_verified を立て、OTPペアを同一UPDATEでクリア
    ///
    /// チャレンジが残っている行だけを更新する。戻り値 0 は並行リクエストに
    /// 消化済みであることを示す。
    pub async fn mark_verified_and_clear_otp(&self, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_verified = TRUE, otp_hash = NULL, otp_expiry = NULL, updated_at = NOW()
            WHERE id = $1 AND otp_hash IS NOT NULL
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// パスワードリセット成功: 新ハッシュ書き込みとOTPペアのクリアを同一UPDATEで行う
    ///
    /// # Note
    /// password_hash はログに出力しないこと
    pub async fn update_password_and_clear_otp(
        &self,
        user_id: Uuid,
        new_password_hash: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, otp_hash = NULL, otp_expiry = NULL, updated_at = NOW()
            WHERE id = $1 AND otp_hash IS NOT NULL
            "#,
        )
        .bind(user_id)
        .bind(new_password_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
