pub mod health;
pub mod login;
pub mod news;
pub mod oauth;
pub mod otp;
pub mod password_reset;
pub mod signup;

pub use health::health_check;
pub use login::login;
pub use news::get_news;
pub use oauth::{oauth_begin, oauth_callback};
pub use otp::{send_otp, verify_otp};
pub use password_reset::reset_password;
pub use signup::signup;
