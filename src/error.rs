//! Error types for the optimizer daemon

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("Database error: {0}")]
  Database(#[from] sea_orm::DbErr),

  #[error("License key not found")]
  LicenseNotFound,

  #[error("License key already used")]
  LicenseUsed,

  #[error("User not found")]
  UserNotFound,

  #[error("Email already registered")]
  EmailTaken,

  #[error("Invalid email or password")]
  InvalidCredentials,

  #[error("Missing or expired session")]
  Unauthorized,

  #[error("Admin privileges required")]
  Forbidden,

  #[error("Server is under maintenance")]
  Maintenance,

  #[error("Active subscription required")]
  SubscriptionRequired,

  #[error("{0}")]
  Invalid(String),

  #[error("Unknown tweak resource: {0}")]
  ResourceNotFound(String),

  #[error("Checksum mismatch for {0}")]
  ChecksumMismatch(String),

  #[error("Command failed: {0}")]
  CommandFailed(String),

  #[error("Host execution is not available on this platform")]
  HostUnavailable,

  #[error("Download error: {0}")]
  Download(#[from] reqwest::Error),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = match &self {
      Error::LicenseNotFound | Error::UserNotFound | Error::ResourceNotFound(_) => {
        StatusCode::NOT_FOUND
      }
      Error::LicenseUsed | Error::EmailTaken => StatusCode::CONFLICT,
      Error::InvalidCredentials | Error::Unauthorized => StatusCode::UNAUTHORIZED,
      Error::Forbidden | Error::SubscriptionRequired => StatusCode::FORBIDDEN,
      Error::Maintenance => StatusCode::SERVICE_UNAVAILABLE,
      Error::Invalid(_) => StatusCode::BAD_REQUEST,
      Error::HostUnavailable => StatusCode::NOT_IMPLEMENTED,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = json::json!({
      "success": false,
      "error": self.to_string(),
    });

    (status, axum::Json(body)).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
