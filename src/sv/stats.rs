use serde::Serialize;

use crate::{
  entity::{user, user::UserType},
  prelude::*,
};

/// Campaign-wide aggregates. Only verified participants count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GiveawayStats {
  pub total_users: u64,
  pub total_creators: u64,
  pub total_clients: u64,
  pub total_entries: i64,
  pub total_referrals: u64,
}

pub struct Stats<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Stats<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn aggregate(&self) -> Result<GiveawayStats> {
    use sea_orm::sea_query::Expr;

    let verified = user::Column::EmailVerified.eq(true);

    let total_users =
      user::Entity::find().filter(verified.clone()).count(self.db).await?;

    let total_creators = user::Entity::find()
      .filter(verified.clone())
      .filter(user::Column::UserType.eq(UserType::Creator))
      .count(self.db)
      .await?;

    let total_clients = user::Entity::find()
      .filter(verified.clone())
      .filter(user::Column::UserType.eq(UserType::Client))
      .count(self.db)
      .await?;

    let total_entries: Option<Option<i64>> = user::Entity::find()
      .select_only()
      .column_as(Expr::col(user::Column::Entries).sum(), "total_entries")
      .filter(verified.clone())
      .into_tuple()
      .one(self.db)
      .await?;

    let total_referrals = user::Entity::find()
      .filter(verified)
      .filter(user::Column::ReferredBy.is_not_null())
      .count(self.db)
      .await?;

    Ok(GiveawayStats {
      total_users,
      total_creators,
      total_clients,
      total_entries: total_entries.flatten().unwrap_or(0),
      total_referrals,
    })
  }
}
