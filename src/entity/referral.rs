use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::user;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "referrals")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  pub referrer_id: String,
  /// Unique: a user is credited as referred at most once.
  #[sea_orm(unique)]
  pub referred_id: String,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::ReferrerId",
    to = "user::Column::Id"
  )]
  Referrer,
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::ReferredId",
    to = "user::Column::Id"
  )]
  Referred,
}

impl ActiveModelBehavior for ActiveModel {}
