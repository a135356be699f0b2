use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;

/// メール送信サービス
///
/// `email` フィーチャー有効時は lettre でSMTP送信する。
/// 無効時（開発環境）は送信せずログ出力のみ。
#[derive(Clone)]
pub struct EmailService {
    config: Arc<Config>,
}

impl EmailService {
    /// 新しい EmailService を作成
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// OTP検証メールを送信
    ///
    /// # Security
    /// - OTPコード（平文）はログに出力しない
    pub async fn send_otp_email(&self, to: &str, name: &str, otp: &str) -> Result<(), AppError> {
        let subject = "Verify Your Email - News Wallah";
        let body = self.build_otp_body(name, otp);

        self.dispatch(to, subject, body).await
    }

    /// OTPメール本文（HTML）を構築
    fn build_otp_body(&self, name: &str, otp: &str) -> String {
        let ttl_minutes = self.config.otp_ttl_secs / 60;
        format!(
            "<html><body>\
             <h1>Welcome to News Wallah!</h1>\
             <p>Hi {name},</p>\
             <p>Please verify your email address by entering the OTP below:</p>\
             <p style=\"font-size: 32px; font-weight: bold; letter-spacing: 8px;\">{otp}</p>\
             <p>This OTP expires in {ttl_minutes} minutes. Never share it with anyone.</p>\
             <p>If you didn't request this, please ignore this email.</p>\
             </body></html>"
        )
    }

    /// lettre によるSMTP送信
    #[cfg(feature = "email")]
    async fn dispatch(&self, to: &str, subject: &str, body: String) -> Result<(), AppError> {
        use lettre::message::header::ContentType;
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
        use secrecy::ExposeSecret;

        let (host, username, password, from_address) = match (
            &self.config.smtp_host,
            &self.config.smtp_username,
            &self.config.smtp_password,
            &self.config.smtp_from_address,
        ) {
            (Some(h), Some(u), Some(p), Some(f)) => (h, u, p, f),
            _ => {
                tracing::error!("SMTP設定が不足しているためメール送信不可");
                return Err(AppError::MailDispatch(anyhow::anyhow!(
                    "smtp not configured"
                )));
            }
        };

        let message = Message::builder()
            .from(from_address.parse().map_err(|e| {
                AppError::MailDispatch(anyhow::anyhow!("invalid from address: {e}"))
            })?)
            .to(to
                .parse()
                .map_err(|e| AppError::MailDispatch(anyhow::anyhow!("invalid to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| AppError::MailDispatch(anyhow::anyhow!("message build error: {e}")))?;

        let credentials = Credentials::new(
            username.expose_secret().clone(),
            password.expose_secret().clone(),
        );
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| AppError::MailDispatch(anyhow::anyhow!("smtp relay error: {e}")))?
            .port(self.config.smtp_port)
            .credentials(credentials)
            .build();

        mailer.send(message).await.map_err(|e| {
            tracing::error!(error = ?e, to = %to, "メール送信失敗");
            AppError::MailDispatch(anyhow::anyhow!("smtp send error: {e}"))
        })?;

        tracing::info!(to = %to, "OTPメール送信完了");

        Ok(())
    }

    /// 開発モード: メール送信せずログ出力のみ
    #[cfg(not(feature = "email"))]
    async fn dispatch(&self, to: &str, subject: &str, _body: String) -> Result<(), AppError> {
        tracing::info!(
            to = %to,
            subject = %subject,
            "メール送信（開発モード: ログ出力のみ）"
        );

        Ok(())
    }
}
