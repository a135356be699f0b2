pub mod user;

pub use user::{OtpChallenge, PROVIDER_CREDENTIALS, User, UserSummary};
