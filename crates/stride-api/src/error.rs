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
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// A concurrent writer won; the client should re-read and retry.
  #[error("conflict: {0}")]
  Conflict(String),

  /// The KPI write committed but its history record did not. Reported
  /// separately from a plain store error so operators can reconcile the
  /// update log.
  #[error("partial write: {0}")]
  PartialWrite(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::PartialWrite(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

impl From<stride_core::Error> for ApiError {
  fn from(e: stride_core::Error) -> Self {
    use stride_core::Error;
    match e {
      Error::Validation(_) | Error::UnknownStatus(_) => {
        ApiError::BadRequest(e.to_string())
      }
      // Bad references in a write body are the client's mistake, not a
      // missing resource.
      Error::UserNotFound(_) | Error::CategoryNotFound(_) => {
        ApiError::BadRequest(e.to_string())
      }
      Error::KpiNotFound(_) | Error::UpdateNotFound(_) => {
        ApiError::NotFound(e.to_string())
      }
      Error::Conflict(_) => ApiError::Conflict(e.to_string()),
      Error::PartialWrite { .. } => ApiError::PartialWrite(e.to_string()),
      Error::Store(source) => ApiError::Store(source),
    }
  }
}
