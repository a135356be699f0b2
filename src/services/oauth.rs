use std::sync::Arc;

use aes_gcm::{
    Aes256Gcm, KeyInit, Nonce,
    aead::{Aead, OsRng},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// 対応ソーシャルログインプロバイダー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    Facebook,
    Github,
    Linkedin,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Google,
        ProviderKind::Facebook,
        ProviderKind::Github,
        ProviderKind::Linkedin,
    ];

    /// users.provider カラムに記録するタグ
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::Facebook => "facebook",
            ProviderKind::Github => "github",
            ProviderKind::Linkedin => "linkedin",
        }
    }

    fn endpoints(&self) -> ProviderEndpoints {
        match self {
            ProviderKind::Google => ProviderEndpoints {
                auth_url: "https://accounts.google.com/o/oauth2/v2/auth",
                token_url: "https://oauth2.googleapis.com/token",
                userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo",
                scope: "openid email profile",
            },
            ProviderKind::Facebook => ProviderEndpoints {
                auth_url: "https://www.facebook.com/v19.0/dialog/oauth",
                token_url: "https://graph.facebook.com/v19.0/oauth/access_token",
                userinfo_url: "https://graph.facebook.com/me",
                scope: "email public_profile",
            },
            ProviderKind::Github => ProviderEndpoints {
                auth_url: "https://github.com/login/oauth/authorize",
                token_url: "https://github.com/login/oauth/access_token",
                userinfo_url: "https://api.github.com/user",
                scope: "user:email",
            },
            ProviderKind::Linkedin => ProviderEndpoints {
                auth_url: "https://www.linkedin.com/oauth/v2/authorization",
                token_url: "https://www.linkedin.com/oauth/v2/accessToken",
                userinfo_url: "https://api.linkedin.com/v2/userinfo",
                scope: "openid profile email",
            },
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// プロバイダーごとのOAuth2エンドポイント
struct ProviderEndpoints {
    auth_url: &'static str,
    token_url: &'static str,
    userinfo_url: &'static str,
    scope: &'static str,
}

/// OAuth ユーザー情報（プロバイダー間で正規化済み）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthUserInfo {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

/// OAuth トークンレスポンス
#[derive(Debug, Deserialize)]
pub struct OAuthTokenResponse {
    pub access_token: String,
}

/// Google userinfo エンドポイントからのレスポンス
#[derive(Debug, Deserialize)]
struct GoogleUserInfoResponse {
    id: String,
    email: String,
    name: Option<String>,
}

/// Facebook Graph API /me からのレスポンス
#[derive(Debug, Deserialize)]
struct FacebookUserInfoResponse {
    id: String,
    name: Option<String>,
    email: Option<String>,
}

/// GitHub /user からのレスポンス
#[derive(Debug, Deserialize)]
struct GithubUserInfoResponse {
    id: i64,
    email: Option<String>,
    name: Option<String>,
    login: String,
}

/// LinkedIn OIDC userinfo からのレスポンス
#[derive(Debug, Deserialize)]
struct LinkedinUserInfoResponse {
    sub: String,
    name: Option<String>,
    email: Option<String>,
}

/// OAuth サービス
///
/// プロバイダーごとに1インスタンスを構築する。エンドポイントとスコープは
/// `ProviderKind` のテーブルから引く。
///
/// # Security
/// - client_secret はログに出力しない
/// - state パラメータは AES-256-GCM で暗号化
/// - ログイン後のリダイレクト先パスを state に埋め込み CSRF 対策
#[derive(Clone)]
pub struct OAuthService {
    provider: ProviderKind,
    client_id: String,
    /// クライアントシークレット（機密情報 - ログ出力禁止）
    client_secret: Arc<String>,
    redirect_uri: String,
    state_encryption_key: [u8; 32],
    http_client: reqwest::Client,
}

impl OAuthService {
    /// 新しい OAuthService を作成
    ///
    /// # Arguments
    /// * `provider` - 対象プロバイダー
    /// * `client_id` - OAuth クライアントID
    /// * `client_secret` - OAuth クライアントシークレット（機密情報）
    /// * `redirect_uri` - OAuth コールバック URI
    /// * `state_secret_base64` - Base64エンコードされた32バイトの暗号化キー
    ///
    /// # Security
    /// `client_secret` は機密情報のため、ログ出力禁止
    pub fn new(
        provider: ProviderKind,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        state_secret_base64: &str,
    ) -> Result<Self, AppError> {
        let key_bytes = URL_SAFE_NO_PAD
            .decode(state_secret_base64)
            .or_else(|_| {
                // URL_SAFE でデコード失敗した場合、STANDARD を試す
                base64::engine::general_purpose::STANDARD.decode(state_secret_base64)
            })
            .map_err(|e| {
                tracing::error!(error = ?e, "OAuth state暗号化キーのBase64デコードエラー");
                AppError::Internal(anyhow::anyhow!("invalid state encryption key format"))
            })?;

        if key_bytes.len() != 32 {
            tracing::error!(
                expected = 32,
                actual = key_bytes.len(),
                "OAuth state暗号化キーの長さが不正"
            );
            return Err(AppError::Internal(anyhow::anyhow!(
                "state encryption key must be 32 bytes"
            )));
        }

        let mut state_encryption_key = [0u8; 32];
        state_encryption_key.copy_from_slice(&key_bytes);

        Ok(Self {
            provider,
            client_id,
            client_secret: Arc::new(client_secret),
            redirect_uri,
            state_encryption_key,
            http_client: reqwest::Client::new(),
        })
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// OAuth 認可 URL を生成
    ///
    /// # Arguments
    /// * `next_path` - ログイン完了後のリダイレクト先（検証済み相対パス）
    ///
    /// # Returns
    /// プロバイダーの認可 URL（state に next_path を暗号化して埋め込み）
    pub fn generate_auth_url(&self, next_path: &str) -> Result<String, AppError> {
        let encrypted_state = self.encrypt_state(next_path)?;
        let endpoints = self.provider.endpoints();

        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", endpoints.scope),
            ("state", &encrypted_state),
        ];

        // Google はアカウント選択画面を常に表示する
        if self.provider == ProviderKind::Google {
            params.push(("access_type", "online"));
            params.push(("prompt", "select_account"));
        }

        let url = reqwest::Url::parse_with_params(endpoints.auth_url, &params).map_err(|e| {
            tracing::error!(error = ?e, provider = %self.provider, "OAuth認可URL生成エラー");
            AppError::Internal(anyhow::anyhow!("failed to generate auth url"))
        })?;

        Ok(url.to_string())
    }

    /// 認可コードをアクセストークンに交換
    ///
    /// # Arguments
    /// * `code` - プロバイダーから受け取った認可コード
    pub async fn exchange_code(&self, code: &str) -> Result<OAuthTokenResponse, AppError> {
        let endpoints = self.provider.endpoints();

        // application/x-www-form-urlencoded 形式で body を構築
        let body = format!(
            "client_id={}&client_secret={}&code={}&grant_type=authorization_code&redirect_uri={}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(self.client_secret.as_str()),
            urlencoding::encode(code),
            urlencoding::encode(&self.redirect_uri),
        );

        let response = self
            .http_client
            .post(endpoints.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            // GitHub はデフォルトで form エンコードを返すため JSON を明示
            .header("Accept", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, provider = %self.provider, "トークンエンドポイント通信エラー");
                AppError::OAuthProviderError
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                provider = %self.provider,
                "トークン交換エラー"
            );
            return Err(AppError::OAuthError(format!(
                "token exchange failed: {}",
                status
            )));
        }

        let token_response: OAuthTokenResponse = response.json().await.map_err(|e| {
            tracing::error!(error = ?e, provider = %self.provider, "トークンレスポンスのパースエラー");
            AppError::OAuthError("invalid token response".to_string())
        })?;

        Ok(token_response)
    }

    /// アクセストークンを使用してユーザー情報を取得
    ///
    /// プロバイダーごとのレスポンス形式を `OAuthUserInfo` に正規化する。
    /// Facebook / LinkedIn はメールアドレス未提供のアカウントがあり、
    /// その場合は認証エラーとする。
    pub async fn get_user_info(&self, access_token: &str) -> Result<OAuthUserInfo, AppError> {
        let endpoints = self.provider.endpoints();

        let mut request = self
            .http_client
            .get(endpoints.userinfo_url)
            .bearer_auth(access_token);

        match self.provider {
            // GitHub API は User-Agent 必須
            ProviderKind::Github => {
                request = request.header("User-Agent", "newsgate");
            }
            ProviderKind::Facebook => {
                request = request.query(&[("fields", "id,name,email")]);
            }
            _ => {}
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = ?e, provider = %self.provider, "userinfo API通信エラー");
            AppError::OAuthProviderError
        })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, provider = %self.provider, "userinfo取得エラー");
            return Err(AppError::OAuthError(format!(
                "userinfo request failed: {}",
                status
            )));
        }

        let user_info = match self.provider {
            ProviderKind::Google => {
                let info: GoogleUserInfoResponse = response.json().await.map_err(|e| {
                    tracing::error!(error = ?e, "Google userinfoレスポンスのパースエラー");
                    AppError::OAuthError("invalid userinfo response".to_string())
                })?;
                OAuthUserInfo {
                    id: info.id,
                    email: info.email,
                    name: info.name,
                }
            }
            ProviderKind::Facebook => {
                let info: FacebookUserInfoResponse = response.json().await.map_err(|e| {
                    tracing::error!(error = ?e, "Facebook userinfoレスポンスのパースエラー");
                    AppError::OAuthError("invalid userinfo response".to_string())
                })?;
                let email = info.email.ok_or_else(|| {
                    tracing::warn!("Facebookアカウントにメールアドレスがありません");
                    AppError::OAuthError("facebook account has no email".to_string())
                })?;
                OAuthUserInfo {
                    id: info.id,
                    email,
                    name: info.name,
                }
            }
            ProviderKind::Github => {
                let info: GithubUserInfoResponse = response.json().await.map_err(|e| {
                    tracing::error!(error = ?e, "GitHub userinfoレスポンスのパースエラー");
                    AppError::OAuthError("invalid userinfo response".to_string())
                })?;
                // GitHub ではメールが公開されていない場合がある
                // その場合は login (ユーザー名) を使用
                let email = info
                    .email
                    .unwrap_or_else(|| format!("{}@github.local", info.login));
                OAuthUserInfo {
                    id: info.id.to_string(),
                    email,
                    name: info.name,
                }
            }
            ProviderKind::Linkedin => {
                let info: LinkedinUserInfoResponse = response.json().await.map_err(|e| {
                    tracing::error!(error = ?e, "LinkedIn userinfoレスポンスのパースエラー");
                    AppError::OAuthError("invalid userinfo response".to_string())
                })?;
                let email = info.email.ok_or_else(|| {
                    tracing::warn!("LinkedInアカウントにメールアドレスがありません");
                    AppError::OAuthError("linkedin account has no email".to_string())
                })?;
                OAuthUserInfo {
                    id: info.sub,
                    email,
                    name: info.name,
                }
            }
        };

        Ok(user_info)
    }

    /// state パラメータをデコードしてリダイレクト先パスを復元
    ///
    /// # Arguments
    /// * `state` - コールバックで受け取った state パラメータ
    pub fn decode_state(&self, state: &str) -> Result<String, AppError> {
        self.decrypt_state(state)
    }

    /// リダイレクト先パスを AES-256-GCM で暗号化し、Base64 URL-safe エンコード
    fn encrypt_state(&self, next_path: &str) -> Result<String, AppError> {
        let cipher = Aes256Gcm::new_from_slice(&self.state_encryption_key).map_err(|e| {
            tracing::error!(error = ?e, "AES-GCM暗号化器の初期化エラー");
            AppError::Internal(anyhow::anyhow!("cipher initialization error"))
        })?;

        // 96ビット (12バイト) のランダム nonce 生成
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher.encrypt(nonce, next_path.as_bytes()).map_err(|e| {
            tracing::error!(error = ?e, "state暗号化エラー");
            AppError::Internal(anyhow::anyhow!("state encryption error"))
        })?;

        // nonce + ciphertext を結合して Base64 URL-safe エンコード
        let mut combined = Vec::with_capacity(12 + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(&combined))
    }

    /// 暗号化された state を復号
    fn decrypt_state(&self, encrypted_state: &str) -> Result<String, AppError> {
        let encrypted = URL_SAFE_NO_PAD.decode(encrypted_state).map_err(|e| {
            tracing::warn!(error = ?e, "state Base64デコードエラー（改ざんの可能性）");
            AppError::OAuthStateInvalid
        })?;

        if encrypted.len() < 12 {
            tracing::warn!(
                len = encrypted.len(),
                "暗号化stateが短すぎる（改ざんの可能性）"
            );
            return Err(AppError::OAuthStateInvalid);
        }

        let cipher = Aes256Gcm::new_from_slice(&self.state_encryption_key).map_err(|e| {
            tracing::error!(error = ?e, "AES-GCM暗号化器の初期化エラー");
            AppError::Internal(anyhow::anyhow!("cipher initialization error"))
        })?;

        let (nonce_bytes, ciphertext) = encrypted.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = cipher.decrypt(nonce, ciphertext).map_err(|e| {
            tracing::warn!(error = ?e, "state復号エラー（改ざんの可能性）");
            AppError::OAuthStateInvalid
        })?;

        String::from_utf8(plaintext).map_err(|e| {
            tracing::warn!(error = ?e, "復号stateのUTF-8変換エラー");
            AppError::OAuthStateInvalid
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    fn create_test_service(provider: ProviderKind) -> OAuthService {
        let key = [0u8; 32];
        let key_base64 = STANDARD.encode(key);
        OAuthService::new(
            provider,
            "test-client-id".to_string(),
            "test-client-secret".to_string(),
            "http://localhost:3000/api/oauth/callback".to_string(),
            &key_base64,
        )
        .unwrap()
    }

    #[test]
    fn test_provider_kind_from_path_segment() {
        let provider: ProviderKind = serde_json::from_str("\"google\"").unwrap();
        assert_eq!(provider, ProviderKind::Google);

        let provider: ProviderKind = serde_json::from_str("\"linkedin\"").unwrap();
        assert_eq!(provider, ProviderKind::Linkedin);

        let result = serde_json::from_str::<ProviderKind>("\"twitter\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_provider_kind_as_str() {
        assert_eq!(ProviderKind::Google.as_str(), "google");
        assert_eq!(ProviderKind::Facebook.as_str(), "facebook");
        assert_eq!(ProviderKind::Github.as_str(), "github");
        assert_eq!(ProviderKind::Linkedin.as_str(), "linkedin");
    }

    #[test]
    fn test_encrypt_decrypt_state() {
        let service = create_test_service(ProviderKind::Google);
        let next_path = "/news?category=technology";

        let encrypted = service.encrypt_state(next_path).unwrap();
        // Base64 URL-safe エンコードされている
        assert!(!encrypted.is_empty());
        assert!(!encrypted.contains('+'));
        assert!(!encrypted.contains('/'));

        let decrypted = service.decrypt_state(&encrypted).unwrap();
        assert_eq!(next_path, decrypted);
    }

    #[test]
    fn test_decode_state_alias() {
        let service = create_test_service(ProviderKind::Github);
        let next_path = "/profile";

        let encrypted = service.encrypt_state(next_path).unwrap();
        let decrypted = service.decode_state(&encrypted).unwrap();
        assert_eq!(next_path, decrypted);
    }

    #[test]
    fn test_decrypt_invalid_state() {
        let service = create_test_service(ProviderKind::Google);

        // 無効な Base64
        let result = service.decrypt_state("not-valid-base64!!!");
        assert!(matches!(result, Err(AppError::OAuthStateInvalid)));

        // 短すぎるデータ
        let short_data = URL_SAFE_NO_PAD.encode([0u8; 5]);
        let result = service.decrypt_state(&short_data);
        assert!(matches!(result, Err(AppError::OAuthStateInvalid)));

        // 改ざんされたデータ
        let tampered = URL_SAFE_NO_PAD.encode([0u8; 50]);
        let result = service.decrypt_state(&tampered);
        assert!(matches!(result, Err(AppError::OAuthStateInvalid)));
    }

    #[test]
    fn test_generate_auth_url_google() {
        let service = create_test_service(ProviderKind::Google);

        let url = service.generate_auth_url("/").unwrap();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth"));
        assert!(url.contains("client_id=test-client-id"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=openid+email+profile"));
        assert!(url.contains("prompt=select_account"));
        assert!(url.contains("state="));
        assert!(url.contains("redirect_uri="));
    }

    #[test]
    fn test_generate_auth_url_github() {
        let service = create_test_service(ProviderKind::Github);

        let url = service.generate_auth_url("/").unwrap();

        assert!(url.starts_with("https://github.com/login/oauth/authorize"));
        assert!(url.contains("scope=user%3Aemail")); // user:email URL encoded
        assert!(!url.contains("prompt=select_account"));
    }

    #[test]
    fn test_generate_auth_url_facebook() {
        let service = create_test_service(ProviderKind::Facebook);

        let url = service.generate_auth_url("/").unwrap();

        assert!(url.starts_with("https://www.facebook.com/v19.0/dialog/oauth"));
        assert!(url.contains("scope=email+public_profile"));
    }

    #[test]
    fn test_generate_auth_url_linkedin() {
        let service = create_test_service(ProviderKind::Linkedin);

        let url = service.generate_auth_url("/").unwrap();

        assert!(url.starts_with("https://www.linkedin.com/oauth/v2/authorization"));
        assert!(url.contains("scope=openid+profile+email"));
    }

    #[test]
    fn test_new_with_invalid_key_length() {
        let short_key = STANDARD.encode([0u8; 16]);
        let result = OAuthService::new(
            ProviderKind::Google,
            "client-id".to_string(),
            "secret".to_string(),
            "http://localhost/callback".to_string(),
            &short_key,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_new_with_invalid_base64() {
        let result = OAuthService::new(
            ProviderKind::Google,
            "client-id".to_string(),
            "secret".to_string(),
            "http://localhost/callback".to_string(),
            "not-valid-base64!!!",
        );
        assert!(result.is_err());
    }
}
