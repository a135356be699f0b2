use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// プロバイダータグ: credentials 登録ユーザー
pub const PROVIDER_CREDENTIALS: &str = "credentials";

/// ユーザーレコード（email をユニークキーとする単一コレクション）
///
/// OTPチャレンジは (otp_hash, otp_expiry) のペアで保持する。
/// 両方揃っている場合のみ有効なチャレンジとみなす（片方だけの状態は
/// スキーマの CHECK 制約とリポジトリの更新方法で作らない）。
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// argon2id ハッシュ。ソーシャルログインのみのユーザーは NULL
    #[serde(skip)]
    pub password_hash: Option<String>,
    /// credentials | google | facebook | github | linkedin
    pub provider: String,
    pub is_verified: bool,
    /// OTPのargon2ハッシュ（平文はメール送信のみ、DBには保存しない）
    #[serde(skip)]
    pub otp_hash: Option<String>,
    /// 絶対期限。スライディングではない
    #[serde(skip)]
    pub otp_expiry: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// アクティブなOTPチャレンジ（検証時のビュー）
#[derive(Debug, Clone, Copy)]
pub struct OtpChallenge<'a> {
    pub otp_hash: &'a str,
    pub expires_at: OffsetDateTime,
}

/// クライアント公開用のユーザー情報
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

impl User {
    /// 未消化のOTPチャレンジを返す
    ///
    /// hash と expiry の両方が揃っている場合のみ Some。
    pub fn otp_challenge(&self) -> Option<OtpChallenge<'_>> {
        match (self.otp_hash.as_deref(), self.otp_expiry) {
            (Some(otp_hash), Some(expires_at)) => Some(OtpChallenge {
                otp_hash,
                expires_at,
            }),
            _ => None,
        }
    }
}
