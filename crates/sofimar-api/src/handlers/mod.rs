//! Route handlers, one module per resource.
//!
//! Bodies are taken as raw bytes and parsed here so that empty or malformed
//! JSON is a 400 with the usual `{"error": ...}` shape.

pub mod admin;
pub mod chatbot;
pub mod documents;
pub mod reviews;
pub mod site;
pub mod status;
pub mod visits;

use axum::{
  Json,
  body::Bytes,
  http::header,
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use sofimar_core::store::SiteStore;

use crate::{AppState, error::ApiError};

pub const PRIVATE_CACHE: &str = "private, no-cache, must-revalidate";

// ─── Bodies ──────────────────────────────────────────────────────────────────

pub(crate) fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
  if body.iter().all(u8::is_ascii_whitespace) {
    return Err(ApiError::bad_request("No body data"));
  }
  serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON: {e}")))
}

pub(crate) fn parse_body_as<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
  serde_json::from_value(parse_body(body)?)
    .map_err(|e| ApiError::bad_request(format!("Invalid body: {e}")))
}

// ─── Query parameters ────────────────────────────────────────────────────────

/// `?id=`, `?keyword=` and `?all=` on DELETE requests.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
  pub id:      Option<String>,
  pub keyword: Option<String>,
  pub all:     Option<String>,
}

impl DeleteParams {
  pub fn all(&self) -> bool {
    matches!(
      self.all.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref(),
      Some("1" | "true" | "yes")
    )
  }

  pub fn id(&self) -> Option<&str> { non_blank(self.id.as_deref()) }

  pub fn keyword(&self) -> Option<&str> { non_blank(self.keyword.as_deref()) }
}

fn non_blank(s: Option<&str>) -> Option<&str> { s.map(str::trim).filter(|s| !s.is_empty()) }

// ─── Responses ───────────────────────────────────────────────────────────────

pub(crate) fn success() -> Json<Value> { Json(json!({ "success": true })) }

/// Cacheable by browsers and CDNs for the configured max age.
pub(crate) fn public_json<S: SiteStore>(state: &AppState<S>, body: impl Serialize) -> Response {
  let cache = format!("public, max-age={}", state.config.cache_max_age_secs);
  ([(header::CACHE_CONTROL, cache)], Json(body)).into_response()
}

/// Admin reads must never be served from a shared cache.
pub(crate) fn private_json(body: impl Serialize) -> Response {
  ([(header::CACHE_CONTROL, PRIVATE_CACHE)], Json(body)).into_response()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_and_malformed_bodies_are_rejected() {
    assert!(parse_body(&Bytes::from_static(b"")).is_err());
    assert!(parse_body(&Bytes::from_static(b"  \n")).is_err());
    assert!(parse_body(&Bytes::from_static(b"{nope")).is_err());
    assert_eq!(parse_body(&Bytes::from_static(b"{\"a\":1}")).unwrap(), json!({"a": 1}));
  }

  #[test]
  fn delete_flags() {
    let params = DeleteParams { all: Some("TRUE".into()), ..Default::default() };
    assert!(params.all());
    let params = DeleteParams { id: Some("  ".into()), all: Some("0".into()), ..Default::default() };
    assert!(!params.all());
    assert_eq!(params.id(), None);
  }
}
