use sea_orm::SqlErr;
use uuid::Uuid;

use crate::{
  entity::{user, user::UserType},
  prelude::*,
  utils, validate,
};

/// Entries every participant starts with.
pub const DEFAULT_ENTRIES: i32 = 1;

/// Attempts to allocate a referral code before giving up. Collisions on an
/// 8-char base36 code are rare enough that more than one retry is unheard of.
const MAX_CODE_ATTEMPTS: usize = 8;

pub struct Users<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Users<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Insert a new participant. The referral code is allocated under the
  /// unique constraint: on a code collision the insert is retried with a
  /// fresh candidate, bounded by [`MAX_CODE_ATTEMPTS`].
  pub async fn create(
    &self,
    email: &str,
    referred_by: Option<String>,
    user_type: UserType,
    token: String,
    token_expiry: DateTime,
  ) -> Result<user::Model> {
    self
      .create_with_codes(
        email,
        referred_by,
        user_type,
        token,
        token_expiry,
        || utils::generate_referral_code(utils::REFERRAL_CODE_LENGTH),
      )
      .await
  }

  /// Same as [`Self::create`] but with an explicit candidate source.
  async fn create_with_codes(
    &self,
    email: &str,
    referred_by: Option<String>,
    user_type: UserType,
    token: String,
    token_expiry: DateTime,
    mut next_code: impl FnMut() -> String,
  ) -> Result<user::Model> {
    let email = validate::normalize_email(email);
    let now = Utc::now().naive_utc();

    for _ in 0..MAX_CODE_ATTEMPTS {
      let candidate = next_code();

      let attempt = user::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        email: Set(email.clone()),
        referral_code: Set(candidate),
        entries: Set(DEFAULT_ENTRIES),
        user_type: Set(user_type),
        referred_by: Set(referred_by.clone()),
        email_verified: Set(false),
        verification_token: Set(Some(token.clone())),
        verification_token_expiry: Set(Some(token_expiry)),
        verification_email_sent_at: Set(None),
        created_at: Set(now),
      }
      .insert(self.db)
      .await;

      match attempt {
        Ok(user) => return Ok(user),
        Err(err) => match err.sql_err() {
          Some(SqlErr::UniqueConstraintViolation(detail)) => {
            if detail.contains("referral_code") {
              debug!("referral code collision, retrying");
              continue;
            }
            // The only other unique column is email
            return Err(Error::AlreadyRegistered);
          }
          _ => return Err(err.into()),
        },
      }
    }

    Err(Error::Internal("could not allocate a unique referral code".into()))
  }

  pub async fn by_email(&self, email: &str) -> Result<Option<user::Model>> {
    let email = validate::normalize_email(email);
    let user = user::Entity::find()
      .filter(user::Column::Email.eq(email))
      .one(self.db)
      .await?;
    Ok(user)
  }

  pub async fn by_referral_code(
    &self,
    code: &str,
  ) -> Result<Option<user::Model>> {
    let user = user::Entity::find()
      .filter(user::Column::ReferralCode.eq(code))
      .one(self.db)
      .await?;
    Ok(user)
  }

  /// Store a fresh token + expiry and clear the outbox marker, so the
  /// redelivery task picks the user up again if the resend fails.
  pub async fn set_verification_token(
    &self,
    user: user::Model,
    token: String,
    token_expiry: DateTime,
  ) -> Result<user::Model> {
    let user = user::ActiveModel {
      verification_token: Set(Some(token)),
      verification_token_expiry: Set(Some(token_expiry)),
      verification_email_sent_at: Set(None),
      ..user.into()
    }
    .update(self.db)
    .await?;

    Ok(user)
  }

  /// Flip to verified and drop the token fields.
  pub async fn mark_verified(&self, user: user::Model) -> Result<user::Model> {
    let user = user::ActiveModel {
      email_verified: Set(true),
      verification_token: Set(None),
      verification_token_expiry: Set(None),
      ..user.into()
    }
    .update(self.db)
    .await?;

    Ok(user)
  }

  pub async fn mark_email_sent(&self, user: user::Model) -> Result<()> {
    let now = Utc::now().naive_utc();
    user::ActiveModel {
      verification_email_sent_at: Set(Some(now)),
      ..user.into()
    }
    .update(self.db)
    .await?;

    Ok(())
  }

  /// Verified participants only, newest first. Unverified rows never show
  /// up in listings or aggregates.
  pub async fn all_verified(&self) -> Result<Vec<user::Model>> {
    let users = user::Entity::find()
      .filter(user::Column::EmailVerified.eq(true))
      .order_by_desc(user::Column::CreatedAt)
      .all(self.db)
      .await?;
    Ok(users)
  }

  /// Unverified users holding a live token whose verification email never
  /// went out. Input for the outbox redelivery sweep.
  pub async fn pending_unsent(&self) -> Result<Vec<user::Model>> {
    let now = Utc::now().naive_utc();
    let users = user::Entity::find()
      .filter(user::Column::EmailVerified.eq(false))
      .filter(user::Column::VerificationEmailSentAt.is_null())
      .filter(user::Column::VerificationToken.is_not_null())
      .filter(user::Column::VerificationTokenExpiry.gte(now))
      .all(self.db)
      .await?;
    Ok(users)
  }
}
