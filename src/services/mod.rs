pub mod auth;
pub mod email;
pub mod feed;
pub mod news;
pub mod oauth;
pub mod otp;

pub use auth::AuthService;
pub use email::EmailService;
pub use feed::ArticleFeed;
pub use news::{NewsCategory, NewsClient, NewsQuery};
pub use oauth::{OAuthService, ProviderKind};
pub use otp::OtpService;
