//! Visit counters and the dashboard statistics.

use axum::{
  Json,
  extract::{Query, State},
  http::header,
  response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::{Value, json};
use sofimar_core::store::SiteStore;

use super::{DeleteParams, private_json};
use crate::{AppState, auth::Admin, error::ApiError};

/// Count one visit for today (UTC). Never cached, or the counter would only
/// see cache misses.
pub async fn track_visit<S: SiteStore + 'static>(
  State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
  let today = Utc::now().format("%Y-%m-%d").to_string();
  let count = state.store.record_visit(today).await.map_err(state.store_err())?;
  Ok(
    (
      [(header::CACHE_CONTROL, "no-store")],
      Json(json!({ "success": true, "count": count })),
    )
      .into_response(),
  )
}

pub async fn list_visits<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
  let visits = state.store.list_visits().await.map_err(state.store_err())?;
  Ok(private_json(visits))
}

pub async fn clear_visits<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
  Query(params): Query<DeleteParams>,
) -> Result<Json<Value>, ApiError> {
  if !params.all() {
    return Err(ApiError::bad_request("Missing all"));
  }
  let deleted = state.store.clear_visits().await.map_err(state.store_err())?;
  tracing::info!(deleted, "visit counters cleared");
  Ok(Json(json!({ "success": true, "deleted": deleted })))
}

/// `GET /api/stats`
pub async fn stats<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
  let stats = state.store.stats().await.map_err(state.store_err())?;
  Ok(private_json(stats))
}
