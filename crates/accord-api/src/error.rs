//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  /// A failed sign-in, whether the email or the password was wrong.
  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("not found: {0}")]
  NotFound(String),

  /// A uniqueness constraint rejected a concurrent write. Retrying is safe.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    ApiError::Store(Box::new(e))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized | ApiError::InvalidCredentials => {
        StatusCode::UNAUTHORIZED
      }
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Store(_) | ApiError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  /// The RPC error code for this error.
  pub fn code(&self) -> &'static str {
    match self {
      ApiError::Unauthorized | ApiError::InvalidCredentials => "UNAUTHORIZED",
      ApiError::BadRequest(_) => "BAD_REQUEST",
      ApiError::NotFound(_) => "NOT_FOUND",
      ApiError::Conflict(_) => "CONFLICT",
      ApiError::Store(_) | ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
    }
  }

  /// The message shown to clients. Unexpected failures are logged here and
  /// replaced with a generic message so no internals leak.
  pub fn public_message(&self) -> String {
    match self {
      ApiError::Unauthorized => "Unauthorized".to_string(),
      ApiError::InvalidCredentials => "Invalid email or password".to_string(),
      ApiError::BadRequest(m) | ApiError::NotFound(m) | ApiError::Conflict(m) => {
        m.clone()
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        "Internal server error".to_string()
      }
      ApiError::Internal(m) => {
        tracing::error!(error = %m, "internal failure");
        "Internal server error".to_string()
      }
    }
  }
}

/// Core validation failures are always the caller's fault.
impl From<accord_core::Error> for ApiError {
  fn from(e: accord_core::Error) -> Self { ApiError::BadRequest(e.to_string()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    (status, Json(json!({ "error": self.public_message() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn store_errors_do_not_leak_details() {
    let err = ApiError::store(std::io::Error::other("disk on fire at /var/db"));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.code(), "INTERNAL_SERVER_ERROR");
    assert_eq!(err.public_message(), "Internal server error");
  }

  #[test]
  fn expected_conditions_keep_their_message() {
    let err = ApiError::NotFound("No current terms found".into());
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    assert_eq!(err.public_message(), "No current terms found");
    assert_eq!(ApiError::Conflict("x".into()).code(), "CONFLICT");
  }
}
