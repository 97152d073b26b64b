//! Handlers for the document collections.
//!
//! | Path | GET | POST | DELETE |
//! |------|-----|------|--------|
//! | `/api/messages` | admin | public, plain insert | admin |
//! | `/api/certificates` | public | admin, upsert | admin |
//! | `/api/partners` | public | admin, upsert | admin |

use axum::{
  Json,
  body::Bytes,
  extract::{Query, State},
  response::Response,
};
use chrono::Utc;
use serde_json::{Value, json};
use sofimar_core::{
  document::{Collection, Document},
  store::SiteStore,
};

use super::{DeleteParams, parse_body, private_json, public_json};
use crate::{AppState, auth::Admin, error::ApiError};

// ─── Shared ──────────────────────────────────────────────────────────────────

async fn list<S: SiteStore>(
  state: &AppState<S>,
  collection: Collection,
) -> Result<Vec<Value>, ApiError> {
  let documents = state.store.list_documents(collection).await.map_err(state.store_err())?;
  Ok(documents.into_iter().map(Document::into_value).collect())
}

async fn save<S: SiteStore>(
  state: &AppState<S>,
  collection: Collection,
  body: &Bytes,
) -> Result<Json<Value>, ApiError> {
  let document = Document::from_payload(parse_body(body)?, Utc::now())?;
  let id = document.id.clone();
  state.store.save_document(collection, document).await.map_err(state.store_err())?;
  tracing::info!(collection = collection.table(), id = %id, "document saved");
  Ok(Json(json!({ "success": true, "id": id })))
}

async fn delete<S: SiteStore>(
  state: &AppState<S>,
  collection: Collection,
  params: &DeleteParams,
) -> Result<Json<Value>, ApiError> {
  if params.all() {
    let deleted = state.store.clear_documents(collection).await.map_err(state.store_err())?;
    tracing::info!(collection = collection.table(), deleted, "collection cleared");
    return Ok(Json(json!({ "success": true, "deleted": deleted })));
  }

  let id = params.id().ok_or_else(|| ApiError::bad_request("Missing id or all"))?;
  let found = state
    .store
    .delete_document(collection, id.to_owned())
    .await
    .map_err(state.store_err())?;
  if !found {
    return Err(ApiError::NotFound(format!("no {} entry with id {id}", collection.table())));
  }
  Ok(Json(json!({ "success": true, "deleted": 1 })))
}

// ─── Messages ────────────────────────────────────────────────────────────────

pub async fn list_messages<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
  Ok(private_json(list(&state, Collection::Messages).await?))
}

pub async fn create_message<S: SiteStore + 'static>(
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<Json<Value>, ApiError> {
  save(&state, Collection::Messages, &body).await
}

pub async fn delete_messages<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
  Query(params): Query<DeleteParams>,
) -> Result<Json<Value>, ApiError> {
  delete(&state, Collection::Messages, &params).await
}

// ─── Certificates ────────────────────────────────────────────────────────────

pub async fn list_certificates<S: SiteStore + 'static>(
  State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
  Ok(public_json(&state, list(&state, Collection::Certificates).await?))
}

pub async fn save_certificate<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<Json<Value>, ApiError> {
  save(&state, Collection::Certificates, &body).await
}

pub async fn delete_certificates<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
  Query(params): Query<DeleteParams>,
) -> Result<Json<Value>, ApiError> {
  delete(&state, Collection::Certificates, &params).await
}

// ─── Partners ────────────────────────────────────────────────────────────────

pub async fn list_partners<S: SiteStore + 'static>(
  State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
  Ok(public_json(&state, list(&state, Collection::Partners).await?))
}

pub async fn save_partner<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<Json<Value>, ApiError> {
  save(&state, Collection::Partners, &body).await
}

pub async fn delete_partners<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
  Query(params): Query<DeleteParams>,
) -> Result<Json<Value>, ApiError> {
  delete(&state, Collection::Partners, &params).await
}
