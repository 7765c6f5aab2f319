use crate::{
  entity::{user, user::UserType},
  prelude::*,
  sv::{Users, mail::Mailer},
  utils, validate,
};

pub struct Registration<'a> {
  db: &'a DatabaseConnection,
  mailer: &'a Mailer,
}

pub enum RegisterOutcome {
  /// New participant created, verification email dispatched.
  Created(user::Model),
  /// Email already registered but unverified; token regenerated and resent.
  Resent(user::Model),
}

impl RegisterOutcome {
  pub fn user(&self) -> &user::Model {
    match self {
      Self::Created(user) | Self::Resent(user) => user,
    }
  }

  pub fn message(&self) -> &'static str {
    match self {
      Self::Created(_) => "Successfully registered for the giveaway!",
      Self::Resent(_) => {
        "Verification email resent. Please check your inbox."
      }
    }
  }
}

impl<'a> Registration<'a> {
  pub fn new(db: &'a DatabaseConnection, mailer: &'a Mailer) -> Self {
    Self { db, mailer }
  }

  /// Register an email for the giveaway, or resend the verification email
  /// for an existing unverified registration.
  ///
  /// No referral bonus is granted here; payout is deferred until the
  /// referred user verifies their address.
  pub async fn register(
    &self,
    email: &str,
    referral_code: Option<&str>,
    user_type: UserType,
  ) -> Result<RegisterOutcome> {
    let email = validate::normalize_email(email);

    if !validate::is_valid_email(&email) {
      return Err(Error::InvalidEmail(
        "Invalid email or temporary email addresses are not allowed".into(),
      ));
    }

    if !validate::is_valid_length(&email) {
      return Err(Error::InvalidEmail(format!(
        "Email must be between {} and {} characters",
        validate::MIN_EMAIL_LENGTH,
        validate::MAX_EMAIL_LENGTH
      )));
    }

    let users = Users::new(self.db);

    if let Some(existing) = users.by_email(&email).await? {
      if existing.email_verified {
        return Err(Error::AlreadyRegistered);
      }
      return self.resend(existing).await;
    }

    if let Some(code) = referral_code {
      let referrer = users
        .by_referral_code(code)
        .await?
        .ok_or(Error::UnknownReferralCode)?;

      if !referrer.email_verified {
        return Err(Error::ReferrerUnverified);
      }

      if referrer.email == email {
        return Err(Error::SelfReferral);
      }
    }

    let token = utils::generate_verification_token();
    let expiry =
      Utc::now().naive_utc() + TimeDelta::hours(utils::TOKEN_TTL_HOURS);

    let user = users
      .create(
        &email,
        referral_code.map(str::to_owned),
        user_type,
        token.clone(),
        expiry,
      )
      .await?;

    info!("registered {} ({:?})", user.email, user.user_type);

    // The row is committed regardless; on dispatch failure the redelivery
    // task retries from the outbox marker.
    self.mailer.send_verification(&user.email, &token).await?;
    users.mark_email_sent(user.clone()).await?;

    Ok(RegisterOutcome::Created(user))
  }

  async fn resend(&self, user: user::Model) -> Result<RegisterOutcome> {
    let token = utils::generate_verification_token();
    let expiry =
      Utc::now().naive_utc() + TimeDelta::hours(utils::TOKEN_TTL_HOURS);

    let users = Users::new(self.db);
    let user = users.set_verification_token(user, token.clone(), expiry).await?;

    self.mailer.send_verification(&user.email, &token).await?;
    users.mark_email_sent(user.clone()).await?;

    Ok(RegisterOutcome::Resent(user))
  }

  /// Outbox sweep: resend verification emails that never went out.
  /// Runs from a background interval task.
  pub async fn redeliver_pending(&self) -> Result<usize> {
    let users = Users::new(self.db);
    let pending = users.pending_unsent().await?;
    let mut delivered = 0;

    for user in pending {
      let Some(token) = user.verification_token.clone() else {
        continue;
      };

      match self.mailer.send_verification(&user.email, &token).await {
        Ok(()) => {
          users.mark_email_sent(user).await?;
          delivered += 1;
        }
        Err(err) => {
          warn!("redelivery to {} failed: {err}", user.email);
        }
      }
    }

    if delivered > 0 {
      info!("redelivered {delivered} verification emails");
    }
    Ok(delivered)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::test_utils::test_db;

  fn mailer() -> Mailer {
    Mailer::disabled("http://localhost:3000".into())
  }

  /// Nothing listens on port 1; every dispatch fails fast.
  fn failing_mailer() -> Mailer {
    Mailer::new(
      "http://localhost:3000".into(),
      "http://127.0.0.1:1".into(),
      "test-key".into(),
    )
    .unwrap()
  }

  #[tokio::test]
  async fn fresh_registration_creates_pending_user() {
    let db = test_db::setup().await;
    let mailer = mailer();

    let outcome = Registration::new(&db, &mailer)
      .register("alice@example.com", None, UserType::Client)
      .await
      .unwrap();

    let user = outcome.user();
    assert!(matches!(outcome, RegisterOutcome::Created(_)));
    assert_eq!(user.entries, 1);
    assert_eq!(user.user_type, UserType::Client);
    assert!(!user.email_verified);
    assert!(user.verification_token.is_some());
  }

  #[tokio::test]
  async fn verified_duplicate_is_rejected() {
    let db = test_db::setup().await;
    let mailer = mailer();
    let registration = Registration::new(&db, &mailer);

    let outcome = registration
      .register("alice@example.com", None, UserType::Client)
      .await
      .unwrap();
    Users::new(&db).mark_verified(outcome.user().clone()).await.unwrap();

    let result = registration
      .register("Alice@Example.com", None, UserType::Client)
      .await;
    assert!(matches!(result, Err(Error::AlreadyRegistered)));
  }

  #[tokio::test]
  async fn unverified_duplicate_regenerates_token() {
    let db = test_db::setup().await;
    let mailer = mailer();
    let registration = Registration::new(&db, &mailer);

    let first = registration
      .register("alice@example.com", None, UserType::Client)
      .await
      .unwrap();
    let first_token = first.user().verification_token.clone();

    let second = registration
      .register("alice@example.com", None, UserType::Client)
      .await
      .unwrap();

    assert!(matches!(second, RegisterOutcome::Resent(_)));
    assert_eq!(first.user().id, second.user().id);
    assert_ne!(first_token, second.user().verification_token);

    // Still a single row
    let all = user::Entity::find().all(&db).await.unwrap();
    assert_eq!(all.len(), 1);
  }

  #[tokio::test]
  async fn unknown_referral_code_is_rejected() {
    let db = test_db::setup().await;
    let mailer = mailer();

    let result = Registration::new(&db, &mailer)
      .register("bob@example.com", Some("NOPE1234"), UserType::Client)
      .await;

    assert!(matches!(result, Err(Error::UnknownReferralCode)));
    assert_eq!(user::Entity::find().all(&db).await.unwrap().len(), 0);
  }

  #[tokio::test]
  async fn unverified_referrer_is_rejected() {
    let db = test_db::setup().await;
    let mailer = mailer();
    let registration = Registration::new(&db, &mailer);

    let alice = registration
      .register("alice@example.com", None, UserType::Client)
      .await
      .unwrap();

    let result = registration
      .register(
        "bob@example.com",
        Some(&alice.user().referral_code),
        UserType::Client,
      )
      .await;

    assert!(matches!(result, Err(Error::ReferrerUnverified)));
  }

  #[tokio::test]
  async fn self_referral_is_rejected() {
    let db = test_db::setup().await;
    let mailer = mailer();
    let registration = Registration::new(&db, &mailer);

    let alice = registration
      .register("alice@example.com", None, UserType::Client)
      .await
      .unwrap();
    let alice =
      Users::new(&db).mark_verified(alice.user().clone()).await.unwrap();

    let result = registration
      .register(
        " ALICE@Example.com ",
        Some(&alice.referral_code),
        UserType::Client,
      )
      .await;

    // Rejected before any referral processing; still exactly one row
    assert!(result.is_err());
    assert_eq!(user::Entity::find().all(&db).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn disposable_email_is_rejected() {
    let db = test_db::setup().await;
    let mailer = mailer();

    let result = Registration::new(&db, &mailer)
      .register("x@mailinator.com", None, UserType::Client)
      .await;

    assert!(matches!(result, Err(Error::InvalidEmail(_))));
  }

  #[tokio::test]
  async fn defaults_to_client_type() {
    let db = test_db::setup().await;
    let mailer = mailer();

    let outcome = Registration::new(&db, &mailer)
      .register("carol@example.com", None, UserType::default())
      .await
      .unwrap();

    assert_eq!(outcome.user().user_type, UserType::Client);
  }

  #[tokio::test]
  async fn failed_dispatch_keeps_pending_row_for_redelivery() {
    let db = test_db::setup().await;
    let broken = failing_mailer();

    let result = Registration::new(&db, &broken)
      .register("alice@example.com", None, UserType::Client)
      .await;
    assert!(matches!(result, Err(Error::Mail(_))));

    // The row committed with its token; the outbox marker stays clear
    let users = Users::new(&db);
    let alice = users.by_email("alice@example.com").await.unwrap().unwrap();
    assert!(!alice.email_verified);
    assert!(alice.verification_token.is_some());
    assert!(alice.verification_email_sent_at.is_none());
    assert_eq!(user::Entity::find().all(&db).await.unwrap().len(), 1);

    // A later sweep with a working mailer delivers it
    let working = mailer();
    let delivered = Registration::new(&db, &working)
      .redeliver_pending()
      .await
      .unwrap();
    assert_eq!(delivered, 1);
  }

  #[tokio::test]
  async fn failed_resend_keeps_regenerated_token() {
    let db = test_db::setup().await;
    let working = mailer();
    let registration = Registration::new(&db, &working);

    let first = registration
      .register("alice@example.com", None, UserType::Client)
      .await
      .unwrap();
    let first_token = first.user().verification_token.clone();

    let broken = failing_mailer();
    let result = Registration::new(&db, &broken)
      .register("alice@example.com", None, UserType::Client)
      .await;
    assert!(matches!(result, Err(Error::Mail(_))));

    // The regenerated token persisted despite the failed send, and the
    // user is back in the outbox scan
    let users = Users::new(&db);
    let alice = users.by_email("alice@example.com").await.unwrap().unwrap();
    assert!(alice.verification_token.is_some());
    assert_ne!(alice.verification_token, first_token);
    assert!(alice.verification_email_sent_at.is_none());
    assert_eq!(user::Entity::find().all(&db).await.unwrap().len(), 1);

    assert_eq!(registration.redeliver_pending().await.unwrap(), 1);
  }

  #[tokio::test]
  async fn redelivery_marks_pending_users() {
    let db = test_db::setup().await;
    let mailer = mailer();
    let registration = Registration::new(&db, &mailer);

    let outcome = registration
      .register("alice@example.com", None, UserType::Client)
      .await
      .unwrap();

    // Simulate a failed initial dispatch by clearing the marker
    let users = Users::new(&db);
    let token = outcome.user().verification_token.clone().unwrap();
    let expiry = outcome.user().verification_token_expiry.unwrap();
    users
      .set_verification_token(outcome.user().clone(), token, expiry)
      .await
      .unwrap();

    let delivered = registration.redeliver_pending().await.unwrap();
    assert_eq!(delivered, 1);
    assert_eq!(registration.redeliver_pending().await.unwrap(), 0);
  }
}
