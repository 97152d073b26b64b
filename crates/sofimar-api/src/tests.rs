use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use chrono::TimeDelta;
use serde_json::{Value, json};
use sofimar_core::store::SiteStore;
use sofimar_store::SqlStore;
use tempfile::TempDir;
use tower::ServiceExt as _;

use super::*;

const PASSWORD: &str = "parola-secreta";

fn make_state() -> (TempDir, AppState<SqlStore>) {
  let dir = tempfile::tempdir().unwrap();
  let store = SqlStore::embedded(dir.path().join("site.db"));
  let auth = AuthConfig {
    username:      "admin".to_owned(),
    password_hash: Some(auth::hash_password(PASSWORD).unwrap()),
    jwt_secret:    b"router-test-secret".to_vec(),
    token_ttl:     TimeDelta::hours(24),
  };
  (dir, AppState::new(store, auth, ApiConfig::default()))
}

async fn oneshot_raw(
  state:   AppState<SqlStore>,
  method:  &str,
  uri:     &str,
  headers: Vec<(header::HeaderName, &str)>,
  body:    &str,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let req = builder.body(Body::from(body.to_owned())).unwrap();
  router(state).oneshot(req).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

async fn login(state: &AppState<SqlStore>) -> String {
  let resp = oneshot_raw(
    state.clone(),
    "POST",
    "/api/login",
    vec![],
    &json!({"username": "admin", "password": PASSWORD}).to_string(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  format!("Bearer {}", body["token"].as_str().unwrap())
}

// ── Messages ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn contact_message_round_trip() {
  let (_dir, state) = make_state();

  let resp = oneshot_raw(
    state.clone(),
    "POST",
    "/api/messages",
    vec![(header::CONTENT_TYPE, "application/json")],
    r#"{"name":"Ion","email":"ion@example.ro","message":"Buna ziua"}"#,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["success"], true);
  let id = body["id"].as_str().unwrap().to_owned();

  let resp = oneshot_raw(state.clone(), "GET", "/api/messages", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let token = login(&state).await;
  let resp = oneshot_raw(
    state.clone(),
    "GET",
    "/api/messages",
    vec![(header::AUTHORIZATION, token.as_str())],
    "",
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[header::CACHE_CONTROL], handlers::PRIVATE_CACHE);
  let list = json_body(resp).await;
  assert_eq!(list.as_array().unwrap().len(), 1);
  assert_eq!(list[0]["id"], id.as_str());
  assert_eq!(list[0]["message"], "Buna ziua");
  assert!(list[0]["timestamp"].is_string());
}

#[tokio::test]
async fn delete_without_token_leaves_row() {
  let (_dir, state) = make_state();
  oneshot_raw(state.clone(), "POST", "/api/messages", vec![], r#"{"id":"m1","message":"x"}"#)
    .await;

  let resp = oneshot_raw(state.clone(), "DELETE", "/api/messages?id=m1", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(json_body(resp).await["error"].is_string());

  let resp = oneshot_raw(
    state.clone(),
    "DELETE",
    "/api/messages?id=m1",
    vec![(header::AUTHORIZATION, "Bearer not-a-jwt")],
    "",
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let remaining = state.store.list_documents(sofimar_core::document::Collection::Messages).await;
  assert_eq!(remaining.unwrap().len(), 1);

  let token = login(&state).await;
  let auth = vec![(header::AUTHORIZATION, token.as_str())];
  let resp = oneshot_raw(state.clone(), "DELETE", "/api/messages", auth.clone(), "").await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = oneshot_raw(state.clone(), "DELETE", "/api/messages?id=m1", auth.clone(), "").await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = oneshot_raw(state, "DELETE", "/api/messages?id=m1", auth, "").await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_message_id_is_400() {
  let (_dir, state) = make_state();
  let body = r#"{"id":"dup","message":"x"}"#;
  let first = oneshot_raw(state.clone(), "POST", "/api/messages", vec![], body).await;
  assert_eq!(first.status(), StatusCode::OK);
  let second = oneshot_raw(state, "POST", "/api/messages", vec![], body).await;
  assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_and_malformed_bodies_are_400() {
  let (_dir, state) = make_state();
  let resp = oneshot_raw(state.clone(), "POST", "/api/messages", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(json_body(resp).await["error"], "No body data");

  let resp = oneshot_raw(state, "POST", "/api/messages", vec![], "{oops").await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ── Certificates ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn certificates_upsert_and_public_cache() {
  let (_dir, state) = make_state();
  let token = login(&state).await;
  let auth = vec![(header::AUTHORIZATION, token.as_str())];

  let resp = oneshot_raw(
    state.clone(),
    "POST",
    "/api/certificates",
    vec![],
    r#"{"id":"c1","title":"ISO"}"#,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  for title in ["ISO 9001", "ISO 14001"] {
    let body = json!({"id": "c1", "title": title}).to_string();
    let resp = oneshot_raw(state.clone(), "POST", "/api/certificates", auth.clone(), &body).await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  let resp = oneshot_raw(state, "GET", "/api/certificates", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[header::CACHE_CONTROL], "public, max-age=60");
  let list = json_body(resp).await;
  assert_eq!(list.as_array().unwrap().len(), 1);
  assert_eq!(list[0]["title"], "ISO 14001");
  assert_eq!(list[0]["type"], "certificat");
}

// ── Reviews ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn out_of_range_ratings_are_rejected() {
  let (_dir, state) = make_state();
  for rating in [0, 6] {
    let body = json!({"author": "Ana", "rating": rating, "comment": "ok"}).to_string();
    let resp = oneshot_raw(state.clone(), "POST", "/api/reviews", vec![], &body).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "rating {rating}");
  }
  assert!(state.store.list_reviews(false).await.unwrap().is_empty());
}

#[tokio::test]
async fn submitted_review_needs_approval() {
  let (_dir, state) = make_state();
  let body = json!({"name": "Ana", "rating": 5, "text": "Foarte bine", "approved": true});
  let resp = oneshot_raw(state.clone(), "POST", "/api/reviews", vec![], &body.to_string()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let id = json_body(resp).await["id"].as_str().unwrap().to_owned();

  let public = json_body(oneshot_raw(state.clone(), "GET", "/api/reviews", vec![], "").await).await;
  assert_eq!(public, json!([]));

  let token = login(&state).await;
  let auth = vec![(header::AUTHORIZATION, token.as_str())];
  let submitted = state.store.get_review(id.clone()).await.unwrap().unwrap();

  // Saves replace the whole review, so a bare flag is not a valid review.
  let partial = json!({"id": id, "approved": true}).to_string();
  let resp =
    oneshot_raw(state.clone(), "POST", "/api/admin/reviews", auth.clone(), &partial).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let approve = json!({
    "id": id, "author": "Ana", "rating": 5, "comment": "Foarte bine", "approved": true,
  })
  .to_string();
  let resp =
    oneshot_raw(state.clone(), "POST", "/api/admin/reviews", auth.clone(), &approve).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let approved = state.store.get_review(id.clone()).await.unwrap().unwrap();
  assert_eq!(approved.timestamp, submitted.timestamp);

  let public = json_body(oneshot_raw(state.clone(), "GET", "/api/reviews", vec![], "").await).await;
  assert_eq!(public.as_array().unwrap().len(), 1);
  assert_eq!(public[0]["author"], "Ana");
  assert_eq!(public[0]["comment"], "Foarte bine");
  assert_eq!(public[0]["approved"], true);

  let uri = format!("/api/admin/reviews?id={id}");
  let resp = oneshot_raw(state, "DELETE", &uri, auth, "").await;
  assert_eq!(resp.status(), StatusCode::OK);
}

// ── Auth ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_rejects_bad_credentials() {
  let (_dir, state) = make_state();
  for body in [
    json!({"username": "admin", "password": "gresit"}),
    json!({"username": "altcineva", "password": PASSWORD}),
    json!({"password": PASSWORD}),
    json!({"username": "", "password": PASSWORD}),
  ] {
    let resp = oneshot_raw(state.clone(), "POST", "/api/login", vec![], &body.to_string()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  let token = login(&state).await;
  let resp = oneshot_raw(
    state,
    "GET",
    "/api/validate",
    vec![(header::AUTHORIZATION, token.as_str())],
    "",
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["valid"], true);
}

#[tokio::test]
async fn admin_password_change() {
  let (_dir, state) = make_state();
  let token = login(&state).await;
  let auth = vec![(header::AUTHORIZATION, token.as_str())];

  let short = json!({"currentPassword": PASSWORD, "newPassword": "abc"}).to_string();
  let resp = oneshot_raw(state.clone(), "POST", "/api/admin-password", auth.clone(), &short).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let wrong = json!({"currentPassword": "gresit", "newPassword": "noua-parola"}).to_string();
  let resp = oneshot_raw(state.clone(), "POST", "/api/admin-password", auth.clone(), &wrong).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let change = json!({"currentPassword": PASSWORD, "newPassword": "noua-parola"}).to_string();
  let resp = oneshot_raw(state.clone(), "POST", "/api/admin-password", auth, &change).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let old = json!({"username": "admin", "password": PASSWORD}).to_string();
  let resp = oneshot_raw(state.clone(), "POST", "/api/login", vec![], &old).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let new = json!({"username": "admin", "password": "noua-parola"}).to_string();
  let resp = oneshot_raw(state, "POST", "/api/login", vec![], &new).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

// ── Protocol ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn options_is_an_empty_200_with_cors() {
  let (_dir, state) = make_state();
  let resp = oneshot_raw(state, "OPTIONS", "/api/anything/at/all", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
  let methods = resp.headers()[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
  assert!(methods.contains("DELETE"), "methods: {methods}");
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  assert!(bytes.is_empty());
}

#[tokio::test]
async fn unknown_route_and_wrong_method() {
  let (_dir, state) = make_state();

  let resp = oneshot_raw(state.clone(), "GET", "/api/nu-exista", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
  assert!(json_body(resp).await["error"].is_string());

  let resp = oneshot_raw(state, "PUT", "/api/messages", vec![], "{}").await;
  assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
  assert_eq!(json_body(resp).await["error"], "Method not allowed");
}

#[tokio::test]
async fn status_and_health() {
  let (_dir, state) = make_state();
  let body = json_body(oneshot_raw(state.clone(), "GET", "/api", vec![], "").await).await;
  assert_eq!(body, json!({"status": "ok", "backend": "embedded"}));

  let resp = oneshot_raw(state, "GET", "/api/health", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
  let body = json_body(resp).await;
  assert_eq!(body["status"], "ok");
  assert_eq!(body["connected"], true);
  assert_eq!(body["fallback"], false);
}

// ── Site settings ────────────────────────────────────────────────────────────

#[tokio::test]
async fn tiktok_videos_default_and_validation() {
  let (_dir, state) = make_state();
  let list = json_body(oneshot_raw(state.clone(), "GET", "/api/tiktok-videos", vec![], "").await)
    .await;
  assert_eq!(list, json!(sofimar_core::singleton::DEFAULT_TIKTOK_VIDEOS));

  let token = login(&state).await;
  let auth = vec![(header::AUTHORIZATION, token.as_str())];
  let bad = r#"{"videos":"7567003645250702614"}"#;
  let resp = oneshot_raw(state.clone(), "POST", "/api/tiktok-videos", auth.clone(), bad).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let good = r#"{"videos":["111","222"]}"#;
  let resp = oneshot_raw(state.clone(), "POST", "/api/tiktok-videos", auth, good).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let list = json_body(oneshot_raw(state, "GET", "/api/tiktok-videos", vec![], "").await).await;
  assert_eq!(list, json!(["111", "222"]));
}

#[tokio::test]
async fn locations_accept_bare_arrays() {
  let (_dir, state) = make_state();
  let list = json_body(oneshot_raw(state.clone(), "GET", "/api/locations", vec![], "").await).await;
  assert_eq!(list, json!([]));

  let token = login(&state).await;
  let auth = vec![(header::AUTHORIZATION, token.as_str())];
  let resp =
    oneshot_raw(state.clone(), "POST", "/api/locations", auth, r#"[{"city":"Iasi"}]"#).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let list = json_body(oneshot_raw(state, "GET", "/api/locations", vec![], "").await).await;
  assert_eq!(list, json!([{"city": "Iasi"}]));
}

// ── Chatbot and visits ───────────────────────────────────────────────────────

#[tokio::test]
async fn chatbot_responses_by_keyword() {
  let (_dir, state) = make_state();
  let token = login(&state).await;
  let auth = vec![(header::AUTHORIZATION, token.as_str())];

  let body = r#"{"keyword":" Program ","response":"Luni-Vineri 9-17"}"#;
  let resp = oneshot_raw(state.clone(), "POST", "/api/chatbot-responses", auth.clone(), body).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let map = json_body(oneshot_raw(state.clone(), "GET", "/api/chatbot-responses", vec![], "").await)
    .await;
  assert_eq!(map, json!({"program": "Luni-Vineri 9-17"}));

  let resp = oneshot_raw(state.clone(), "DELETE", "/api/chatbot-responses", auth.clone(), "").await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp =
    oneshot_raw(state, "DELETE", "/api/chatbot-responses?keyword=PROGRAM", auth, "").await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn chat_transcript_is_public_write_admin_read() {
  let (_dir, state) = make_state();
  let line = r#"{"type":"user","message":"Aveti program sambata?"}"#;
  let resp = oneshot_raw(state.clone(), "POST", "/api/chatbot", vec![], line).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = oneshot_raw(state.clone(), "GET", "/api/chatbot", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let token = login(&state).await;
  let resp = oneshot_raw(
    state,
    "GET",
    "/api/chatbot",
    vec![(header::AUTHORIZATION, token.as_str())],
    "",
  )
  .await;
  let list = json_body(resp).await;
  assert_eq!(list[0]["message"], "Aveti program sambata?");
  assert_eq!(list[0]["type"], "user");
}

#[tokio::test]
async fn oversized_chat_id_is_not_found() {
  let (_dir, state) = make_state();
  let token = login(&state).await;
  let auth = vec![(header::AUTHORIZATION, token.as_str())];
  for uri in ["/api/chatbot?id=99999999999", "/api/chatbot?id=-1", "/api/chatbot?id=42"] {
    let resp = oneshot_raw(state.clone(), "DELETE", uri, auth.clone(), "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
  }
  let resp = oneshot_raw(state, "DELETE", "/api/chatbot?id=abc", auth, "").await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn visits_are_counted() {
  let (_dir, state) = make_state();
  for expected in 1..=2 {
    let resp = oneshot_raw(state.clone(), "GET", "/api/track-visit", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-store");
    assert_eq!(json_body(resp).await["count"], expected);
  }

  let token = login(&state).await;
  let auth = vec![(header::AUTHORIZATION, token.as_str())];
  let stats = json_body(oneshot_raw(state.clone(), "GET", "/api/stats", auth.clone(), "").await)
    .await;
  assert_eq!(stats["visits_total"], 2);

  let resp = oneshot_raw(state.clone(), "DELETE", "/api/visits", auth.clone(), "").await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let resp = oneshot_raw(state.clone(), "DELETE", "/api/visits?all=1", auth.clone(), "").await;
  assert_eq!(resp.status(), StatusCode::OK);

  let visits = json_body(oneshot_raw(state, "GET", "/api/visits", auth, "").await).await;
  assert_eq!(visits, json!({}));
}
