pub mod draw;
pub mod mail;
pub mod referral;
pub mod registration;
pub mod stats;
#[cfg(test)]
pub mod test_utils;
pub mod user;
pub mod verification;

pub use draw::Draw;
pub use mail::Mailer;
pub use referral::Referrals;
pub use registration::Registration;
pub use stats::Stats;
pub use user::Users;
pub use verification::Verification;
