use uuid::Uuid;

use crate::{
  entity::{referral, user},
  prelude::*,
};

/// Entries granted to a referrer when their referred user verifies.
pub const REFERRAL_BONUS: i32 = 1;

pub struct Referrals<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Referrals<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Pay out the one-time referral bonus for a just-verified user.
  ///
  /// The referrer is re-resolved inside the transaction and must currently
  /// be verified; if they are gone or unverified the payout is skipped and
  /// the caller proceeds (the referred user stays verified). The entries
  /// increment is a relative SQL update, so concurrent payouts to the same
  /// referrer cannot lose updates. Returns whether a bonus was credited.
  pub async fn credit_bonus(&self, referred: &user::Model) -> Result<bool> {
    use sea_orm::sea_query::{Expr, ExprTrait};

    let Some(code) = &referred.referred_by else {
      return Ok(false);
    };

    let txn = self.db.begin().await?;

    let referrer = user::Entity::find()
      .filter(user::Column::ReferralCode.eq(code))
      .filter(user::Column::EmailVerified.eq(true))
      .one(&txn)
      .await?;

    let Some(referrer) = referrer else {
      debug!("referrer for code {code} missing or unverified, skipping bonus");
      txn.commit().await?;
      return Ok(false);
    };

    let already_credited = referral::Entity::find()
      .filter(referral::Column::ReferredId.eq(&referred.id))
      .one(&txn)
      .await?
      .is_some();

    if already_credited {
      txn.commit().await?;
      return Ok(false);
    }

    user::Entity::update_many()
      .col_expr(
        user::Column::Entries,
        Expr::col(user::Column::Entries).add(REFERRAL_BONUS),
      )
      .filter(user::Column::Id.eq(&referrer.id))
      .exec(&txn)
      .await?;

    referral::ActiveModel {
      id: Set(Uuid::new_v4().to_string()),
      referrer_id: Set(referrer.id.clone()),
      referred_id: Set(referred.id.clone()),
      created_at: Set(Utc::now().naive_utc()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!("credited referral bonus to {} for {}", referrer.id, referred.id);
    Ok(true)
  }

  #[allow(dead_code)]
  pub async fn exists_for(&self, referred_id: &str) -> Result<bool> {
    let row = referral::Entity::find()
      .filter(referral::Column::ReferredId.eq(referred_id))
      .one(self.db)
      .await?;
    Ok(row.is_some())
  }

  #[allow(dead_code)]
  pub async fn count(&self) -> Result<u64> {
    Ok(referral::Entity::find().count(self.db).await?)
  }
}
