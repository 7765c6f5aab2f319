pub mod referral;
pub mod user;

pub use user::UserType;
