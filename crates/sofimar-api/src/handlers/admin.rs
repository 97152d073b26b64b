//! Login, token validation and admin password changes.

use axum::{Json, body::Bytes, extract::State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use sofimar_core::store::SiteStore;

use super::{parse_body_as, success};
use crate::{
  AppState,
  auth::{Admin, MIN_PASSWORD_LEN, effective_password_hash, hash_password, verify_password},
  error::ApiError,
};

#[derive(Debug, Deserialize)]
struct LoginBody {
  username: Option<String>,
  #[serde(default)]
  password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordChange {
  current_password: String,
  new_password:     String,
}

/// `POST /api/login`
pub async fn login<S: SiteStore + 'static>(
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<Json<Value>, ApiError> {
  let body: LoginBody = parse_body_as(&body)?;

  if body.username.as_deref().map(str::trim) != Some(state.auth.username.as_str()) {
    tracing::info!("login rejected: unknown username");
    return Err(ApiError::Unauthorized("Invalid credentials"));
  }

  let Some(hash) = effective_password_hash(&state).await? else {
    tracing::warn!("login attempted but no admin password is configured");
    return Err(ApiError::Unauthorized("Invalid credentials"));
  };
  if !verify_password(&body.password, &hash) {
    tracing::info!("login rejected: wrong password");
    return Err(ApiError::Unauthorized("Invalid credentials"));
  }

  let token = state.auth.issue_token(Utc::now())?;
  tracing::info!(username = %state.auth.username, "admin logged in");
  Ok(Json(json!({
    "success":   true,
    "token":     token,
    "expiresIn": state.auth.token_ttl.num_seconds(),
  })))
}

/// `GET /api/validate`
pub async fn validate(admin: Admin) -> Json<Value> {
  Json(json!({ "valid": true, "username": admin.username }))
}

/// `POST /api/admin-password`
pub async fn change_password<S: SiteStore + 'static>(
  _: Admin,
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<Json<Value>, ApiError> {
  let change: PasswordChange = parse_body_as(&body)?;

  let current = effective_password_hash(&state).await?;
  if !current.is_some_and(|hash| verify_password(&change.current_password, &hash)) {
    return Err(ApiError::Unauthorized("Current password is incorrect"));
  }
  if change.new_password.chars().count() < MIN_PASSWORD_LEN {
    return Err(ApiError::bad_request(format!(
      "New password must be at least {MIN_PASSWORD_LEN} characters"
    )));
  }

  let hash = hash_password(&change.new_password)?;
  state.store.set_admin_password_hash(hash).await.map_err(state.store_err())?;
  tracing::info!("admin password changed");
  Ok(success())
}
