//! Server configuration and state assembly for the sofimar binary.
//!
//! Settings come from an optional TOML file layered with `SOFIMAR_*`
//! environment variables. Every field has a default, so the server starts
//! with no configuration at all (but nobody can log in until an admin
//! password hash is supplied).

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use chrono::TimeDelta;
use rand_core::{OsRng, RngCore};
use serde::Deserialize;
use sofimar_api::{ApiConfig, AppState, AuthConfig};
use sofimar_store::{SqlStore, Storage, StorageConfig};

/// Prefix for environment overrides, e.g. `SOFIMAR_PORT=8080`.
pub const ENV_PREFIX: &str = "SOFIMAR";

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub admin_username:       String,
  /// Argon2 PHC string; generate one with `--hash-password`.
  pub admin_password_hash:  Option<String>,
  pub jwt_secret:           Option<String>,
  pub token_ttl_hours:      i64,
  /// SQLite file for the embedded backend. Defaults by host platform.
  pub store_path:           Option<PathBuf>,
  pub connect_timeout_secs: u64,
  pub cache_max_age_secs:   u32,
  /// Forced on when `VERCEL_ENV=production`.
  pub production:           bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                 "127.0.0.1".to_owned(),
      port:                 3000,
      admin_username:       "admin".to_owned(),
      admin_password_hash:  None,
      jwt_secret:           None,
      token_ttl_hours:      24,
      store_path:           None,
      connect_timeout_secs: 5,
      cache_max_age_secs:   60,
      production:           false,
    }
  }
}

impl ServerConfig {
  /// Read `path` (if it exists) and apply environment overrides.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn is_production(&self, lookup: impl Fn(&str) -> Option<String>) -> bool {
    self.production || lookup("VERCEL_ENV").is_some_and(|env| env == "production")
  }

  pub fn storage_config(&self, lookup: impl Fn(&str) -> Option<String>) -> StorageConfig {
    let path = match &self.store_path {
      Some(path) => expand_tilde(path),
      None => StorageConfig::default_embedded_path(lookup),
    };
    StorageConfig {
      embedded_path:   path,
      connect_timeout: Duration::from_secs(self.connect_timeout_secs),
    }
  }

  /// Without a configured secret every restart invalidates issued tokens.
  pub fn auth_config(&self) -> AuthConfig {
    let jwt_secret = match self.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
      Some(secret) => secret.as_bytes().to_vec(),
      None => {
        tracing::warn!("no jwt_secret configured; using a random per-process secret");
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes).into_bytes()
      }
    };
    if self.admin_password_hash.is_none() {
      tracing::warn!("no admin_password_hash configured; admin login disabled until one is set");
    }
    AuthConfig {
      username: self.admin_username.clone(),
      password_hash: self.admin_password_hash.clone(),
      jwt_secret,
      token_ttl: TimeDelta::hours(self.token_ttl_hours),
    }
  }
}

// ─── Assembly ────────────────────────────────────────────────────────────────

/// Build the application state. No database work happens here; the backend is
/// selected and migrated on the first request.
pub fn build_state(cfg: &ServerConfig) -> AppState<SqlStore> {
  let env = |name: &str| std::env::var(name).ok();
  let storage = Storage::new(cfg.storage_config(env));
  let api = ApiConfig {
    production:         cfg.is_production(env),
    cache_max_age_secs: cfg.cache_max_age_secs,
  };
  AppState::new(SqlStore::new(storage), cfg.auth_config(), api)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
