use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    // NewsAPI 設定
    pub news_api_key: SecretBox<String>,
    #[serde(default = "default_news_api_base_url")]
    pub news_api_base_url: String,

    // OTP 設定
    /// OTPチャレンジの有効期間（秒）。期限は発行時刻 + TTL の絶対時刻
    #[serde(default = "default_otp_ttl_secs")]
    pub otp_ttl_secs: i64,

    // SMTP設定（オプション - email機能有効時のみ使用）
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<SecretBox<String>>,
    pub smtp_password: Option<SecretBox<String>>,
    #[serde(default)]
    pub smtp_from_address: Option<String>,

    // OAuth2 ソーシャルログイン設定
    /// OAuthステート暗号化用シークレット（必須、32バイト推奨）
    pub oauth_state_secret: SecretBox<String>,
    /// ログイン完了後のリダイレクト先（相対パス）
    #[serde(default = "default_post_login_redirect")]
    pub post_login_redirect: String,

    // CORS設定（未設定時は全オリジン許可）
    #[serde(default)]
    pub cors_allow_origin: Option<String>,

    // Google OAuth設定（オプション）
    #[serde(default)]
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<SecretBox<String>>,
    #[serde(default)]
    pub google_redirect_uri: Option<String>,

    // Facebook OAuth設定（オプション）
    #[serde(default)]
    pub facebook_client_id: Option<String>,
    pub facebook_client_secret: Option<SecretBox<String>>,
    #[serde(default)]
    pub facebook_redirect_uri: Option<String>,

    // GitHub OAuth設定（オプション）
    #[serde(default)]
    pub github_client_id: Option<String>,
    pub github_client_secret: Option<SecretBox<String>>,
    #[serde(default)]
    pub github_redirect_uri: Option<String>,

    // LinkedIn OAuth設定（オプション）
    #[serde(default)]
    pub linkedin_client_id: Option<String>,
    pub linkedin_client_secret: Option<SecretBox<String>>,
    #[serde(default)]
    pub linkedin_redirect_uri: Option<String>,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_NEWS_API_BASE_URL: &str = "https://newsapi.org/v2";
const DEFAULT_OTP_TTL_SECS: i64 = 600;
const DEFAULT_POST_LOGIN_REDIRECT: &str = "/";

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_news_api_base_url() -> String {
    DEFAULT_NEWS_API_BASE_URL.to_string()
}

fn default_otp_ttl_secs() -> i64 {
    DEFAULT_OTP_TTL_SECS
}

fn default_post_login_redirect() -> String {
    DEFAULT_POST_LOGIN_REDIRECT.to_string()
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}
