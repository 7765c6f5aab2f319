use crate::{
  prelude::*,
  sv::{Referrals, Users, mail::Mailer},
};

pub struct Verification<'a> {
  db: &'a DatabaseConnection,
  mailer: &'a Mailer,
}

pub enum VerifyOutcome {
  Verified,
  AlreadyVerified,
}

impl VerifyOutcome {
  pub fn message(&self) -> &'static str {
    match self {
      Self::Verified => {
        "Email verified successfully! You can now participate in the giveaway."
      }
      Self::AlreadyVerified => "Email already verified",
    }
  }
}

impl<'a> Verification<'a> {
  pub fn new(db: &'a DatabaseConnection, mailer: &'a Mailer) -> Self {
    Self { db, mailer }
  }

  /// Consume a token+email pair. Idempotent: a verified user gets a
  /// success response and no mutation, whatever token is presented.
  pub async fn verify(
    &self,
    email: &str,
    token: &str,
  ) -> Result<VerifyOutcome> {
    let users = Users::new(self.db);

    let user = users.by_email(email).await?.ok_or(Error::UserNotFound)?;

    if user.email_verified {
      return Ok(VerifyOutcome::AlreadyVerified);
    }

    if user.verification_token.as_deref() != Some(token) {
      return Err(Error::InvalidToken);
    }

    if let Some(expiry) = user.verification_token_expiry
      && Utc::now().naive_utc() > expiry
    {
      return Err(Error::TokenExpired);
    }

    let user = users.mark_verified(user).await?;
    info!("verified {}", user.email);

    // Deferred referral payout; skipped silently if the referrer is gone
    // or unverified by now
    if user.referred_by.is_some() {
      Referrals::new(self.db).credit_bonus(&user).await?;
    }

    // Welcome mail must never fail verification
    if let Err(err) =
      self.mailer.send_welcome(&user.email, &user.referral_code).await
    {
      warn!("welcome email to {} failed: {err}", user.email);
    }

    Ok(VerifyOutcome::Verified)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::{user, user::UserType},
    sv::{Registration, test_utils::test_db},
  };

  fn mailer() -> Mailer {
    Mailer::disabled("http://localhost:3000".into())
  }

  async fn register(
    db: &DatabaseConnection,
    email: &str,
    code: Option<&str>,
  ) -> user::Model {
    let mailer = mailer();
    Registration::new(db, &mailer)
      .register(email, code, UserType::Client)
      .await
      .unwrap()
      .user()
      .clone()
  }

  #[tokio::test]
  async fn verify_flips_once_and_clears_token() {
    let db = test_db::setup().await;
    let mailer = mailer();
    let verification = Verification::new(&db, &mailer);

    let alice = register(&db, "alice@example.com", None).await;
    let token = alice.verification_token.clone().unwrap();

    let outcome =
      verification.verify("alice@example.com", &token).await.unwrap();
    assert!(matches!(outcome, VerifyOutcome::Verified));

    let alice = Users::new(&db)
      .by_email("alice@example.com")
      .await
      .unwrap()
      .unwrap();
    assert!(alice.email_verified);
    assert!(alice.verification_token.is_none());
    assert!(alice.verification_token_expiry.is_none());

    // Any token now yields the idempotent success
    let again = verification
      .verify("alice@example.com", "whatever")
      .await
      .unwrap();
    assert!(matches!(again, VerifyOutcome::AlreadyVerified));
  }

  #[tokio::test]
  async fn mismatched_token_mutates_nothing() {
    let db = test_db::setup().await;
    let mailer = mailer();

    let alice = register(&db, "alice@example.com", None).await;

    let result = Verification::new(&db, &mailer)
      .verify("alice@example.com", "wrong-token")
      .await;
    assert!(matches!(result, Err(Error::InvalidToken)));

    let unchanged = Users::new(&db)
      .by_email("alice@example.com")
      .await
      .unwrap()
      .unwrap();
    assert!(!unchanged.email_verified);
    assert_eq!(unchanged.verification_token, alice.verification_token);
  }

  #[tokio::test]
  async fn expired_token_is_rejected() {
    let db = test_db::setup().await;
    let mailer = mailer();
    let users = Users::new(&db);

    let alice = register(&db, "alice@example.com", None).await;
    let token = alice.verification_token.clone().unwrap();
    users
      .set_verification_token(
        alice,
        token.clone(),
        Utc::now().naive_utc() - TimeDelta::hours(1),
      )
      .await
      .unwrap();

    let result =
      Verification::new(&db, &mailer).verify("alice@example.com", &token).await;
    assert!(matches!(result, Err(Error::TokenExpired)));

    let unchanged =
      users.by_email("alice@example.com").await.unwrap().unwrap();
    assert!(!unchanged.email_verified);
  }

  #[tokio::test]
  async fn unknown_email_is_not_found() {
    let db = test_db::setup().await;
    let mailer = mailer();

    let result = Verification::new(&db, &mailer)
      .verify("ghost@example.com", "token")
      .await;
    assert!(matches!(result, Err(Error::UserNotFound)));
  }

  #[tokio::test]
  async fn bonus_paid_when_referrer_verified_at_verify_time() {
    let db = test_db::setup().await;
    let mailer = mailer();
    let verification = Verification::new(&db, &mailer);
    let users = Users::new(&db);

    let alice = register(&db, "alice@example.com", None).await;
    let alice_token = alice.verification_token.clone().unwrap();
    verification.verify("alice@example.com", &alice_token).await.unwrap();

    let alice = users.by_email("alice@example.com").await.unwrap().unwrap();
    let bob =
      register(&db, "bob@example.com", Some(&alice.referral_code)).await;
    let bob_token = bob.verification_token.clone().unwrap();

    verification.verify("bob@example.com", &bob_token).await.unwrap();

    let alice = users.by_email("alice@example.com").await.unwrap().unwrap();
    assert_eq!(alice.entries, 2);

    // Re-verifying Bob cannot double-credit
    verification.verify("bob@example.com", &bob_token).await.unwrap();
    let alice = users.by_email("alice@example.com").await.unwrap().unwrap();
    assert_eq!(alice.entries, 2);
  }

  #[tokio::test]
  async fn bonus_skipped_when_referrer_unverified() {
    let db = test_db::setup().await;
    let mailer = mailer();
    let verification = Verification::new(&db, &mailer);
    let users = Users::new(&db);

    // Alice verified at registration time so Bob's sign-up is accepted,
    // then unverify her before Bob verifies
    let alice = register(&db, "alice@example.com", None).await;
    let alice_token = alice.verification_token.clone().unwrap();
    verification.verify("alice@example.com", &alice_token).await.unwrap();
    let alice = users.by_email("alice@example.com").await.unwrap().unwrap();

    let bob =
      register(&db, "bob@example.com", Some(&alice.referral_code)).await;
    let bob_token = bob.verification_token.clone().unwrap();

    user::ActiveModel { email_verified: Set(false), ..alice.into() }
      .update(&db)
      .await
      .unwrap();

    verification.verify("bob@example.com", &bob_token).await.unwrap();

    let bob = users.by_email("bob@example.com").await.unwrap().unwrap();
    assert!(bob.email_verified);

    let alice = users.by_email("alice@example.com").await.unwrap().unwrap();
    assert_eq!(alice.entries, 1);
  }
}
