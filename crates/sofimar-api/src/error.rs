//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use sofimar_core::{ErrorKind, StoreError};
use thiserror::Error;

/// An error returned by an API handler. Every variant renders as
/// `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized: {0}")]
  Unauthorized(&'static str),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("method not allowed")]
  MethodNotAllowed,

  /// `detail` is only populated outside production.
  #[error("internal error: {message}")]
  Internal {
    message: String,
    detail:  Option<String>,
  },
}

impl ApiError {
  pub fn bad_request(message: impl Into<String>) -> Self { ApiError::BadRequest(message.into()) }

  /// Map a storage error by its kind: bad input becomes 400, everything else
  /// is logged and surfaces as 500.
  pub fn from_store<E: StoreError>(e: E, production: bool) -> Self {
    match e.kind() {
      ErrorKind::Constraint | ErrorKind::Validation => ApiError::BadRequest(e.to_string()),
      kind => {
        tracing::error!(?kind, error = %e, "storage operation failed");
        ApiError::Internal {
          message: "internal server error".to_owned(),
          detail:  (!production).then(|| e.to_string()),
        }
      }
    }
  }
}

impl From<sofimar_core::Error> for ApiError {
  fn from(e: sofimar_core::Error) -> Self { ApiError::BadRequest(e.to_string()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, json!({ "error": m })),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::MethodNotAllowed => {
        (StatusCode::METHOD_NOT_ALLOWED, json!({ "error": "Method not allowed" }))
      }
      ApiError::Internal { message, detail: Some(detail) } => (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": message, "detail": detail }),
      ),
      ApiError::Internal { message, detail: None } => {
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
      }
    };
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Error)]
  #[error("{0:?} failure")]
  struct Fake(ErrorKind);

  impl StoreError for Fake {
    fn kind(&self) -> ErrorKind { self.0 }
  }

  #[test]
  fn bad_input_kinds_are_400() {
    for kind in [ErrorKind::Constraint, ErrorKind::Validation] {
      let status = ApiError::from_store(Fake(kind), true).into_response().status();
      assert_eq!(status, StatusCode::BAD_REQUEST);
    }
  }

  #[test]
  fn detail_hidden_in_production() {
    let err = ApiError::from_store(Fake(ErrorKind::Query), true);
    assert!(matches!(err, ApiError::Internal { detail: None, .. }));

    let err = ApiError::from_store(Fake(ErrorKind::Connection), false);
    assert!(matches!(err, ApiError::Internal { detail: Some(_), .. }));
    assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
