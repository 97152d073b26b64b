//! Backend identity and health reporting.

use serde::Serialize;

/// Which relational backend a connection talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
  /// Local SQLite file; also the fallback target.
  Embedded,
  /// Remote PostgreSQL reached through a connection string.
  Networked,
}

impl BackendKind {
  pub fn as_str(self) -> &'static str {
    match self {
      BackendKind::Embedded => "embedded",
      BackendKind::Networked => "networked",
    }
  }
}

impl std::fmt::Display for BackendKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Result of a storage liveness check.
#[derive(Debug, Clone, Serialize)]
pub struct Health {
  /// Backend chosen from configuration.
  pub configured: BackendKind,
  /// Backend that served the probe; differs from `configured` on fallback.
  pub active:     Option<BackendKind>,
  pub fallback:   bool,
  pub connected:  bool,
  pub error:      Option<String>,
}
