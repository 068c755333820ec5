//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use menagerie_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// `If-Match` did not match the stored version.
  #[error("precondition failed: {0}")]
  PreconditionFailed(String),

  /// Idempotency key already used.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self {
    match e {
      CoreError::SubjectNotFound(_) | CoreError::LocationNotFound(_) => {
        ApiError::NotFound(e.to_string())
      }
      CoreError::VersionConflict { .. } => {
        ApiError::PreconditionFailed(e.to_string())
      }
      CoreError::DuplicateRequest(_) => ApiError::Conflict(e.to_string()),
      CoreError::MalformedVersionToken(_)
      | CoreError::UnknownLocations(_)
      | CoreError::Validation(_) => ApiError::BadRequest(e.to_string()),
      CoreError::Store(e) => ApiError::Internal(e.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::PreconditionFailed(m) => {
        (StatusCode::PRECONDITION_FAILED, m.clone())
      }
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
