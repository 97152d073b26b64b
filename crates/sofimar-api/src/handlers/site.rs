//! Singleton site settings: texts, TikTok videos and shop locations.
//!
//! Reads fall back to [`Singleton::default_value`] until an administrator
//! saves something.

use axum::{Json, body::Bytes, extract::State, response::Response};
use serde_json::{Value, json};
use sofimar_core::{singleton::Singleton, store::SiteStore};

use super::{parse_body, public_json};
use crate::{AppState, auth::Admin, error::ApiError};

async fn read<S: SiteStore>(
  state: &AppState<S>,
  singleton: Singleton,
) -> Result<Response, ApiError> {
  let value = state.store.get_singleton(singleton).await.map_err(state.store_err())?;
  Ok(public_json(state, value.unwrap_or_else(|| singleton.default_value())))
}

async fn write<S: SiteStore>(
  state: &AppState<S>,
  singleton: Singleton,
  value: Value,
) -> Result<Json<Value>, ApiError> {
  singleton.validate(&value)?;
  state.store.put_singleton(singleton, value).await.map_err(state.store_err())?;
  tracing::info!(singleton = singleton.table(), "site setting updated");
  Ok(Json(json!({ "success": true })))
}

/// Pull the list out of `{field: [...]}`. A missing field stores an empty
/// list; any other shape is rejected.
fn unwrap_list(body: Value, field: &str, accept_bare: bool) -> Result<Value, ApiError> {
  match body {
    Value::Array(_) if accept_bare => Ok(body),
    Value::Object(mut map) => match map.remove(field) {
      None | Some(Value::Null) => Ok(json!([])),
      Some(list @ Value::Array(_)) => Ok(list),
      Some(_) => Err(ApiError::bad_request(format!("Invalid {field}"))),
    },
    _ => Err(ApiError::bad_request(format!("Invalid {field}"))),
  }
}

// ─── Site texts ──────────────────────────────────────────────────────────────

pub async fn get_site_texts<S: SiteStore + 'static>(
  State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
  read(&state, Singleton::SiteTexts).await
}

pub async fn put_site_texts<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<Json<Value>, ApiError> {
  write(&state, Singleton::SiteTexts, parse_body(&body)?).await
}

// ─── TikTok videos ───────────────────────────────────────────────────────────

pub async fn get_tiktok_videos<S: SiteStore + 'static>(
  State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
  read(&state, Singleton::TiktokVideos).await
}

pub async fn put_tiktok_videos<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<Json<Value>, ApiError> {
  let videos = unwrap_list(parse_body(&body)?, "videos", false)?;
  write(&state, Singleton::TiktokVideos, videos).await
}

// ─── Locations ───────────────────────────────────────────────────────────────

pub async fn get_locations<S: SiteStore + 'static>(
  State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
  read(&state, Singleton::Locations).await
}

pub async fn put_locations<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<Json<Value>, ApiError> {
  let locations = unwrap_list(parse_body(&body)?, "locations", true)?;
  write(&state, Singleton::Locations, locations).await
}
