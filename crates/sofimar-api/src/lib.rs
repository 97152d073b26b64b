//! JSON REST API for the sofimar site.
//!
//! Exposes an axum [`Router`] backed by any [`SiteStore`]. Every response is
//! JSON with permissive CORS; `OPTIONS` on any path answers 200 with an empty
//! body. Admin endpoints require a bearer token issued by `POST /api/login`.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = sofimar_api::router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
  Router,
  http::{HeaderValue, Method, header},
  routing::{get, post},
};
use sofimar_core::store::SiteStore;
use tower_http::{
  cors::{Any, CorsLayer},
  set_header::SetResponseHeaderLayer,
  trace::TraceLayer,
};

pub use auth::AuthConfig;
pub use error::ApiError;

use handlers::{admin, chatbot, documents, reviews, site, status, visits};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Behaviour switches that are not about authentication.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// Hides internal error detail from responses.
  pub production:         bool,
  /// `max-age` for cacheable public reads.
  pub cache_max_age_secs: u32,
}

impl Default for ApiConfig {
  fn default() -> Self { Self { production: false, cache_max_age_secs: 60 } }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S: SiteStore> {
  pub store:  Arc<S>,
  pub auth:   Arc<AuthConfig>,
  pub config: Arc<ApiConfig>,
}

impl<S: SiteStore> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      auth:   Arc::clone(&self.auth),
      config: Arc::clone(&self.config),
    }
  }
}

impl<S: SiteStore> AppState<S> {
  pub fn new(store: S, auth: AuthConfig, config: ApiConfig) -> Self {
    Self { store: Arc::new(store), auth: Arc::new(auth), config: Arc::new(config) }
  }

  /// Error mapper for store calls, honouring the production flag.
  pub fn store_err(&self) -> impl Fn(S::Error) -> ApiError + '_ {
    move |e| ApiError::from_store(e, self.config.production)
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S: SiteStore + 'static>(state: AppState<S>) -> Router {
  Router::new()
    // Status
    .route("/api",        get(status::index::<S>))
    .route("/api/",       get(status::index::<S>))
    .route("/api/health", get(status::health::<S>))
    .route("/api/test",   get(status::health::<S>))
    // Admin session
    .route("/api/login",          post(admin::login::<S>))
    .route("/api/validate",       get(admin::validate))
    .route("/api/admin-password", post(admin::change_password::<S>))
    .route("/api/stats",          get(visits::stats::<S>))
    // Documents
    .route(
      "/api/messages",
      get(documents::list_messages::<S>)
        .post(documents::create_message::<S>)
        .delete(documents::delete_messages::<S>),
    )
    .route(
      "/api/certificates",
      get(documents::list_certificates::<S>)
        .post(documents::save_certificate::<S>)
        .delete(documents::delete_certificates::<S>),
    )
    .route(
      "/api/partners",
      get(documents::list_partners::<S>)
        .post(documents::save_partner::<S>)
        .delete(documents::delete_partners::<S>),
    )
    // Reviews
    .route("/api/reviews", get(reviews::public_list::<S>).post(reviews::submit::<S>))
    .route(
      "/api/admin/reviews",
      get(reviews::admin_list::<S>)
        .post(reviews::admin_save::<S>)
        .delete(reviews::admin_delete::<S>),
    )
    // Chatbot
    .route(
      "/api/chatbot",
      get(chatbot::list_transcript::<S>)
        .post(chatbot::append_transcript::<S>)
        .delete(chatbot::delete_transcript::<S>),
    )
    .route(
      "/api/chatbot-responses",
      get(chatbot::list_responses::<S>)
        .post(chatbot::save_responses::<S>)
        .delete(chatbot::delete_responses::<S>),
    )
    // Site settings
    .route("/api/site-texts",    get(site::get_site_texts::<S>).post(site::put_site_texts::<S>))
    .route(
      "/api/tiktok-videos",
      get(site::get_tiktok_videos::<S>).post(site::put_tiktok_videos::<S>),
    )
    .route("/api/locations",     get(site::get_locations::<S>).post(site::put_locations::<S>))
    // Visits
    .route("/api/track-visit",   get(visits::track_visit::<S>).post(visits::track_visit::<S>))
    .route("/api/visits",        get(visits::list_visits::<S>).delete(visits::clear_visits::<S>))
    .fallback(not_found)
    .method_not_allowed_fallback(method_not_allowed)
    .with_state(state)
    .layer(cors_layer())
    .layer(SetResponseHeaderLayer::if_not_present(
      header::CONTENT_TYPE,
      HeaderValue::from_static("application/json"),
    ))
    .layer(TraceLayer::new_for_http())
}

/// Any origin; every `OPTIONS` request is answered here as a preflight.
fn cors_layer() -> CorsLayer {
  CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn not_found() -> ApiError { ApiError::NotFound("Not found".to_owned()) }

async fn method_not_allowed() -> ApiError { ApiError::MethodNotAllowed }

#[cfg(test)]
mod tests;
