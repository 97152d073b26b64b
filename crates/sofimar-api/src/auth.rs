//! Bearer-token authentication for admin endpoints.
//!
//! Login verifies the admin password against an argon2 PHC hash and issues
//! an HS256 JWT. The [`Admin`] extractor guards every admin-only handler.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{header, request::Parts},
};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sofimar_core::store::SiteStore;

use crate::{AppState, error::ApiError};

/// Minimum length accepted for a new admin password.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Token signing and credential settings for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string used until a password is stored through the API.
  pub password_hash: Option<String>,
  pub jwt_secret:    Vec<u8>,
  pub token_ttl:     TimeDelta,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
  pub sub: String,
  pub iat: i64,
  pub exp: i64,
}

impl AuthConfig {
  pub fn issue_token(&self, now: DateTime<Utc>) -> Result<String, ApiError> {
    let claims = Claims {
      sub: self.username.clone(),
      iat: now.timestamp(),
      exp: (now + self.token_ttl).timestamp(),
    };
    encode(
      &Header::new(Algorithm::HS256),
      &claims,
      &EncodingKey::from_secret(&self.jwt_secret),
    )
    .map_err(|e| ApiError::Internal {
      message: "could not issue token".to_owned(),
      detail:  Some(e.to_string()),
    })
  }

  pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
    let validation = Validation::new(Algorithm::HS256);
    let claims = decode::<Claims>(token, &DecodingKey::from_secret(&self.jwt_secret), &validation)
      .map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        ApiError::Unauthorized("Invalid or expired token")
      })?
      .claims;
    if claims.sub != self.username {
      return Err(ApiError::Unauthorized("Invalid or expired token"));
    }
    Ok(claims)
  }
}

// ─── Passwords ───────────────────────────────────────────────────────────────

pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Internal {
      message: "could not hash password".to_owned(),
      detail:  Some(e.to_string()),
    })
}

/// False for a wrong password and for a malformed hash.
pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    .unwrap_or(false)
}

/// The hash login is checked against: the stored one if an administrator has
/// changed the password, otherwise the configured one.
pub async fn effective_password_hash<S: SiteStore>(
  state: &AppState<S>,
) -> Result<Option<String>, ApiError> {
  let stored = state.store.admin_password_hash().await.map_err(state.store_err())?;
  Ok(stored.or_else(|| state.auth.password_hash.clone()))
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// Present in a handler's arguments means the request carried a valid admin
/// token.
#[derive(Debug)]
pub struct Admin {
  pub username: String,
}

impl<S: SiteStore> FromRequestParts<AppState<S>> for Admin {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = parts
      .headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.strip_prefix("Bearer "))
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .ok_or(ApiError::Unauthorized("Missing bearer token"))?;

    let claims = state.auth.verify_token(token)?;
    Ok(Admin { username: claims.sub })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config() -> AuthConfig {
    AuthConfig {
      username:      "admin".to_owned(),
      password_hash: None,
      jwt_secret:    b"test-secret".to_vec(),
      token_ttl:     TimeDelta::hours(24),
    }
  }

  #[test]
  fn token_round_trip() {
    let cfg = config();
    let token = cfg.issue_token(Utc::now()).unwrap();
    let claims = cfg.verify_token(&token).unwrap();
    assert_eq!(claims.sub, "admin");
    assert_eq!(claims.exp - claims.iat, 24 * 3600);
  }

  #[test]
  fn expired_token_is_rejected() {
    let cfg = config();
    let token = cfg.issue_token(Utc::now() - TimeDelta::hours(48)).unwrap();
    assert!(matches!(cfg.verify_token(&token), Err(ApiError::Unauthorized(_))));
  }

  #[test]
  fn foreign_secret_is_rejected() {
    let token = config().issue_token(Utc::now()).unwrap();
    let other = AuthConfig { jwt_secret: b"other".to_vec(), ..config() };
    assert!(other.verify_token(&token).is_err());
  }

  #[test]
  fn password_hashing() {
    let hash = hash_password("parola123").unwrap();
    assert!(verify_password("parola123", &hash));
    assert!(!verify_password("gresit", &hash));
    assert!(!verify_password("parola123", "not-a-phc-string"));
  }
}
