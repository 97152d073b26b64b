//! `GET /api` and `GET /api/health`.

use axum::{Json, extract::State};
use serde_json::{Value, json};
use sofimar_core::store::SiteStore;

use crate::AppState;

pub async fn index<S: SiteStore + 'static>(State(state): State<AppState<S>>) -> Json<Value> {
  Json(json!({
    "status": "ok",
    "backend": state.store.backend(),
  }))
}

/// Probes storage. Always 200; `status` and `connected` report the outcome.
pub async fn health<S: SiteStore + 'static>(State(state): State<AppState<S>>) -> Json<Value> {
  let health = state.store.health().await;
  if let Some(error) = &health.error {
    tracing::warn!(error = %error, "health probe failed");
  }
  Json(json!({
    "status":     if health.connected { "ok" } else { "error" },
    "configured": health.configured,
    "active":     health.active,
    "fallback":   health.fallback,
    "connected":  health.connected,
    "error":      health.error,
  }))
}
