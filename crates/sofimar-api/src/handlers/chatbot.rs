//! Chatbot transcript and keyword responses.

use std::collections::BTreeMap;

use axum::{
  Json,
  body::Bytes,
  extract::{Query, State},
  response::Response,
};
use chrono::Utc;
use serde_json::{Value, json};
use sofimar_core::{
  chat::{ChatbotResponse, NewChatEntry},
  store::SiteStore,
};

use super::{DeleteParams, parse_body, private_json, public_json};
use crate::{AppState, auth::Admin, error::ApiError};

// ─── Transcript ──────────────────────────────────────────────────────────────

pub async fn list_transcript<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
  let entries = state.store.list_chat_entries().await.map_err(state.store_err())?;
  Ok(private_json(entries))
}

/// The public widget appends both the visitor's and the bot's lines.
pub async fn append_transcript<S: SiteStore + 'static>(
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<Json<Value>, ApiError> {
  let entry = NewChatEntry::from_payload(parse_body(&body)?, Utc::now())?;
  let id = state.store.append_chat_entry(entry).await.map_err(state.store_err())?;
  tracing::debug!(id, "chat line appended");
  Ok(Json(json!({ "success": true, "id": id })))
}

pub async fn delete_transcript<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
  Query(params): Query<DeleteParams>,
) -> Result<Json<Value>, ApiError> {
  if params.all() {
    let deleted = state.store.clear_chat_entries().await.map_err(state.store_err())?;
    tracing::info!(deleted, "chat transcript cleared");
    return Ok(Json(json!({ "success": true, "deleted": deleted })));
  }

  let id = params.id().ok_or_else(|| ApiError::bad_request("Missing id or all"))?;
  let id: i64 = id.parse().map_err(|_| ApiError::bad_request(format!("Invalid id: {id}")))?;
  if !state.store.delete_chat_entry(id).await.map_err(state.store_err())? {
    return Err(ApiError::NotFound(format!("no chat entry with id {id}")));
  }
  Ok(Json(json!({ "success": true, "deleted": 1 })))
}

// ─── Responses ───────────────────────────────────────────────────────────────

/// `{keyword: response}`, ordered by keyword.
pub async fn list_responses<S: SiteStore + 'static>(
  State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
  let responses = state.store.list_chatbot_responses().await.map_err(state.store_err())?;
  let map: BTreeMap<String, String> =
    responses.into_iter().map(|r| (r.keyword, r.response)).collect();
  Ok(public_json(&state, map))
}

/// Accepts a single `{keyword, response}` pair or a `{keyword: response}` map.
pub async fn save_responses<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<Json<Value>, ApiError> {
  let responses = parse_responses(parse_body(&body)?)?;
  let saved = responses.len();
  for response in responses {
    state.store.save_chatbot_response(response).await.map_err(state.store_err())?;
  }
  tracing::info!(saved, "chatbot responses saved");
  Ok(Json(json!({ "success": true, "saved": saved })))
}

fn parse_responses(body: Value) -> Result<Vec<ChatbotResponse>, ApiError> {
  let Value::Object(map) = body else {
    return Err(ApiError::bad_request("Expected a JSON object"));
  };

  if let Some(keyword) = map.get("keyword") {
    let keyword = keyword.as_str().ok_or_else(|| ApiError::bad_request("Invalid keyword"))?;
    let response = map
      .get("response")
      .and_then(Value::as_str)
      .ok_or_else(|| ApiError::bad_request("Invalid response"))?;
    return Ok(vec![ChatbotResponse::new(keyword, response)?]);
  }

  if map.is_empty() {
    return Err(ApiError::bad_request("No responses given"));
  }
  map
    .iter()
    .map(|(keyword, response)| -> Result<ChatbotResponse, ApiError> {
      let response = response
        .as_str()
        .ok_or_else(|| ApiError::bad_request(format!("Response for {keyword:?} is not text")))?;
      Ok(ChatbotResponse::new(keyword, response)?)
    })
    .collect()
}

pub async fn delete_responses<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
  Query(params): Query<DeleteParams>,
) -> Result<Json<Value>, ApiError> {
  if params.all() {
    let deleted = state.store.clear_chatbot_responses().await.map_err(state.store_err())?;
    tracing::info!(deleted, "chatbot responses cleared");
    return Ok(Json(json!({ "success": true, "deleted": deleted })));
  }

  let keyword = params.keyword().ok_or_else(|| ApiError::bad_request("Missing keyword or all"))?;
  let found = state
    .store
    .delete_chatbot_response(keyword.to_owned())
    .await
    .map_err(state.store_err())?;
  if !found {
    return Err(ApiError::NotFound(format!("no response for keyword {keyword}")));
  }
  Ok(Json(json!({ "success": true, "deleted": 1 })))
}
