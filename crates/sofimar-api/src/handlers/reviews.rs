//! Public review submission and the admin moderation endpoints.

use axum::{
  Json,
  body::Bytes,
  extract::{Query, State},
  response::Response,
};
use chrono::Utc;
use serde_json::{Value, json};
use sofimar_core::{review::ReviewInput, store::SiteStore};

use super::{DeleteParams, parse_body_as, private_json, public_json};
use crate::{AppState, auth::Admin, error::ApiError};

/// `GET /api/reviews`: approved reviews only.
pub async fn public_list<S: SiteStore + 'static>(
  State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
  let reviews = state.store.list_reviews(true).await.map_err(state.store_err())?;
  Ok(public_json(&state, reviews))
}

/// `POST /api/reviews`: always lands unapproved under a fresh id.
pub async fn submit<S: SiteStore + 'static>(
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<Json<Value>, ApiError> {
  let input: ReviewInput = parse_body_as(&body)?;
  let input = ReviewInput { id: None, approved: None, ..input };
  let review = input.into_review(false, Utc::now())?;
  let id = review.id.clone();

  state.store.save_review(review).await.map_err(state.store_err())?;
  tracing::info!(id = %id, "review submitted for moderation");
  Ok(Json(json!({ "success": true, "id": id })))
}

/// `GET /api/admin/reviews`
pub async fn admin_list<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
  let reviews = state.store.list_reviews(false).await.map_err(state.store_err())?;
  Ok(private_json(reviews))
}

/// `POST /api/admin/reviews`
///
/// Replaces the whole review. An existing review keeps its original
/// submission time so moderation does not reorder the list.
pub async fn admin_save<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<Json<Value>, ApiError> {
  let input: ReviewInput = parse_body_as(&body)?;
  let mut review = input.into_review(true, Utc::now())?;

  let stored = state.store.get_review(review.id.clone()).await.map_err(state.store_err())?;
  if let Some(stored) = stored {
    review.timestamp = stored.timestamp;
  }

  let id = review.id.clone();
  let approved = review.approved;
  state.store.save_review(review).await.map_err(state.store_err())?;
  tracing::info!(id = %id, approved, "review saved");
  Ok(Json(json!({ "success": true, "id": id })))
}

/// `DELETE /api/admin/reviews?id=`
pub async fn admin_delete<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
  Query(params): Query<DeleteParams>,
) -> Result<Json<Value>, ApiError> {
  let id = params.id().ok_or_else(|| ApiError::bad_request("Missing id"))?;
  if !state.store.delete_review(id.to_owned()).await.map_err(state.store_err())? {
    return Err(ApiError::NotFound(format!("no review with id {id}")));
  }
  Ok(Json(json!({ "success": true, "deleted": 1 })))
}
