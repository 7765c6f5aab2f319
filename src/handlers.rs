use axum::{
  Json,
  extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::{
  entity::{user, user::UserType},
  prelude::*,
  state::AppState,
  sv, utils,
};

/// Participant projection returned by the API. Token fields never leave
/// the server.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
  pub id: String,
  pub email: String,
  pub referral_code: String,
  pub entries: i32,
  pub user_type: UserType,
  pub referred_by: Option<String>,
  pub email_verified: bool,
  pub created_at: DateTime,
}

impl From<user::Model> for PublicUser {
  fn from(user: user::Model) -> Self {
    Self {
      id: user.id,
      email: user.email,
      referral_code: user.referral_code,
      entries: user.entries,
      user_type: user.user_type,
      referred_by: user.referred_by,
      email_verified: user.email_verified,
      created_at: user.created_at,
    }
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReq {
  pub email: Option<String>,
  pub referral_code: Option<String>,
  pub user_type: Option<UserType>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResp {
  pub success: bool,
  pub message: String,
  pub referral_code: String,
  pub user: PublicUser,
}

pub async fn register(
  State(app): State<Arc<AppState>>,
  Json(req): Json<RegisterReq>,
) -> Result<Json<RegisterResp>> {
  let email = req
    .email
    .ok_or_else(|| Error::InvalidEmail("Email is required".into()))?;

  let registration = sv::Registration::new(&app.db, &app.mailer);

  let outcome = registration
    .register(
      &email,
      req.referral_code.as_deref(),
      req.user_type.unwrap_or_default(),
    )
    .await?;

  let message = outcome.message().to_string();
  let user = outcome.user().clone();

  Ok(Json(RegisterResp {
    success: true,
    message,
    referral_code: user.referral_code.clone(),
    user: user.into(),
  }))
}

#[derive(Deserialize)]
pub struct VerifyParams {
  pub token: Option<String>,
  pub email: Option<String>,
}

#[derive(Serialize)]
pub struct VerifyResp {
  pub message: String,
}

pub async fn verify(
  State(app): State<Arc<AppState>>,
  Query(params): Query<VerifyParams>,
) -> Result<Json<VerifyResp>> {
  let (Some(token), Some(email)) = (params.token, params.email) else {
    return Err(Error::MissingVerifyParams);
  };

  let outcome =
    sv::Verification::new(&app.db, &app.mailer).verify(&email, &token).await?;

  Ok(Json(VerifyResp { message: outcome.message().to_string() }))
}

#[derive(Deserialize)]
pub struct StatsParams {
  pub email: Option<String>,
  pub code: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsUser {
  pub email: String,
  pub referral_code: String,
  pub entries: i32,
  pub user_type: UserType,
  pub email_verified: bool,
  pub referral_link: String,
}

#[derive(Serialize)]
pub struct StatsResp {
  pub success: bool,
  pub user: StatsUser,
}

/// Per-participant stats, looked up by email or referral code.
pub async fn stats(
  State(app): State<Arc<AppState>>,
  Query(params): Query<StatsParams>,
) -> Result<Json<StatsResp>> {
  let users = sv::Users::new(&app.db);

  let user = match (params.email, params.code) {
    (Some(email), _) => users.by_email(&email).await?,
    (None, Some(code)) => users.by_referral_code(&code).await?,
    (None, None) => None,
  }
  .ok_or(Error::UserNotFound)?;

  let referral_link = utils::referral_link(&app.base_url, &user.referral_code);

  Ok(Json(StatsResp {
    success: true,
    user: StatsUser {
      email: user.email,
      referral_code: user.referral_code,
      entries: user.entries,
      user_type: user.user_type,
      email_verified: user.email_verified,
      referral_link,
    },
  }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatsResp {
  pub total_users: u64,
  pub total_creators: u64,
  pub total_clients: u64,
  pub total_entries: i64,
  pub total_referrals: u64,
  pub users: Vec<PublicUser>,
}

/// Verified participants plus campaign aggregates. The admin page sits
/// behind an external gate; this endpoint carries no auth of its own.
pub async fn admin_stats(
  State(app): State<Arc<AppState>>,
) -> Result<Json<AdminStatsResp>> {
  let stats = sv::Stats::new(&app.db).aggregate().await?;
  let users = sv::Users::new(&app.db).all_verified().await?;

  Ok(Json(AdminStatsResp {
    total_users: stats.total_users,
    total_creators: stats.total_creators,
    total_clients: stats.total_clients,
    total_entries: stats.total_entries,
    total_referrals: stats.total_referrals,
    users: users.into_iter().map(PublicUser::from).collect(),
  }))
}

#[derive(Serialize)]
pub struct WinnerResp {
  pub winner: PublicUser,
}

pub async fn winner(
  State(app): State<Arc<AppState>>,
) -> Result<Json<WinnerResp>> {
  let winner =
    sv::Draw::new(&app.db).winner().await?.ok_or(Error::UserNotFound)?;

  Ok(Json(WinnerResp { winner: winner.into() }))
}

pub async fn health() -> &'static str {
  "OK"
}
