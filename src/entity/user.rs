use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::referral;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum UserType {
  #[sea_orm(string_value = "client")]
  #[default]
  Client,
  #[sea_orm(string_value = "creator")]
  Creator,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  #[sea_orm(unique)]
  pub email: String,
  #[sea_orm(unique)]
  pub referral_code: String,
  pub entries: i32,
  pub user_type: UserType,
  /// Referral code of the user who referred this one, not an id.
  pub referred_by: Option<String>,
  pub email_verified: bool,
  pub verification_token: Option<String>,
  pub verification_token_expiry: Option<DateTime>,
  /// Outbox marker: set once the verification email went out.
  pub verification_email_sent_at: Option<DateTime>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// Two foreign keys point from referrals to users; expose the referrer side.
impl Related<referral::Entity> for Entity {
  fn to() -> RelationDef {
    referral::Relation::Referrer.def().rev()
  }
}

impl ActiveModelBehavior for ActiveModel {}
