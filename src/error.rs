use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use sea_orm::DbErr;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("{0}")]
  InvalidEmail(String),
  #[error("Email already registered")]
  AlreadyRegistered,
  #[error("Invalid referral code")]
  UnknownReferralCode,
  #[error("Referral code belongs to an unverified account")]
  ReferrerUnverified,
  #[error("You cannot use your own referral code")]
  SelfReferral,
  #[error("Missing verification token or email")]
  MissingVerifyParams,
  #[error("Invalid verification token")]
  InvalidToken,
  #[error("Verification token has expired")]
  TokenExpired,
  #[error("User not found")]
  UserNotFound,
  #[error("Failed to send email")]
  Mail(String),
  #[error(transparent)]
  Db(#[from] DbErr),
  #[error("{0}")]
  Internal(String),
}

impl Error {
  fn status(&self) -> StatusCode {
    match self {
      Self::InvalidEmail(_)
      | Self::AlreadyRegistered
      | Self::UnknownReferralCode
      | Self::ReferrerUnverified
      | Self::SelfReferral
      | Self::MissingVerifyParams
      | Self::InvalidToken
      | Self::TokenExpired => StatusCode::BAD_REQUEST,
      Self::UserNotFound => StatusCode::NOT_FOUND,
      Self::Mail(_) | Self::Db(_) | Self::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();

    // Dependency failures are logged in full, callers get a generic message
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
      match &self {
        Self::Mail(err) => {
          tracing::error!("mail dispatch failed: {err}");
          "Failed to send email".to_string()
        }
        other => {
          tracing::error!("internal error: {other}");
          "Internal server error".to_string()
        }
      }
    } else {
      self.to_string()
    };

    (status, Json(json::json!({ "error": message }))).into_response()
  }
}
