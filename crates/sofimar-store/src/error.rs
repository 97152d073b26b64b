//! Error type for `sofimar-store`.
//!
//! Backend errors are classified at the boundary so callers see the same
//! variants whichever dialect produced them.

use rusqlite::ErrorCode;
use sofimar_core::{ErrorKind, StoreError};
use thiserror::Error;
use tokio_postgres::error::SqlState;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] sofimar_core::Error),

  /// Backend unreachable, authentication failed, or the connection dropped.
  #[error("connection error: {0}")]
  Connection(String),

  /// DDL failed for a reason other than "already exists".
  #[error("schema error: {0}")]
  Schema(String),

  #[error("constraint violation: {0}")]
  Constraint(String),

  /// The object a DDL statement tried to create is already there.
  #[error("already exists: {0}")]
  AlreadyExists(String),

  #[error("query error: {0}")]
  Query(String),

  #[error("column {column:?}: {reason}")]
  Column {
    column: String,
    reason: String,
  },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl StoreError for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::Core(e) => e.kind(),
      Error::Connection(_) => ErrorKind::Connection,
      Error::Schema(_) => ErrorKind::Schema,
      Error::Constraint(_) => ErrorKind::Constraint,
      Error::AlreadyExists(_) | Error::Query(_) => ErrorKind::Query,
      Error::Column { .. } | Error::Json(_) => ErrorKind::Internal,
    }
  }
}

// ─── Embedded ────────────────────────────────────────────────────────────────

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    let message = e.to_string();
    match &e {
      rusqlite::Error::SqliteFailure(failure, detail) => {
        let detail = detail.as_deref().unwrap_or_default();
        match failure.code {
          ErrorCode::ConstraintViolation => Error::Constraint(message),
          ErrorCode::CannotOpen
          | ErrorCode::NotADatabase
          | ErrorCode::PermissionDenied
          | ErrorCode::ReadOnly
          | ErrorCode::SystemIoFailure => Error::Connection(message),
          _ if is_sqlite_duplicate(detail) => Error::AlreadyExists(message),
          _ => Error::Query(message),
        }
      }
      _ => Error::Query(message),
    }
  }
}

fn is_sqlite_duplicate(detail: &str) -> bool {
  detail.contains("already exists") || detail.contains("duplicate column name")
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Rusqlite(inner) => inner.into(),
      tokio_rusqlite::Error::ConnectionClosed => {
        Error::Connection("embedded connection closed".to_owned())
      }
      tokio_rusqlite::Error::Close((_, inner)) => Error::Connection(inner.to_string()),
      other => Error::Query(other.to_string()),
    }
  }
}

// ─── Networked ───────────────────────────────────────────────────────────────

impl From<tokio_postgres::Error> for Error {
  fn from(e: tokio_postgres::Error) -> Self {
    let message = e.to_string();
    let Some(code) = e.code() else {
      return if e.is_closed() {
        Error::Connection(message)
      } else {
        Error::Query(message)
      };
    };

    if *code == SqlState::UNIQUE_VIOLATION
      || *code == SqlState::CHECK_VIOLATION
      || *code == SqlState::NOT_NULL_VIOLATION
      || *code == SqlState::FOREIGN_KEY_VIOLATION
      || *code == SqlState::INTEGRITY_CONSTRAINT_VIOLATION
    {
      Error::Constraint(db_message(&e, message))
    } else if *code == SqlState::DUPLICATE_TABLE
      || *code == SqlState::DUPLICATE_COLUMN
      || *code == SqlState::DUPLICATE_OBJECT
    {
      Error::AlreadyExists(db_message(&e, message))
    } else if code.code().starts_with("08")
      || *code == SqlState::INVALID_PASSWORD
      || *code == SqlState::INVALID_AUTHORIZATION_SPECIFICATION
      || *code == SqlState::ADMIN_SHUTDOWN
    {
      Error::Connection(db_message(&e, message))
    } else {
      Error::Query(db_message(&e, message))
    }
  }
}

/// Prefer the server's message over the generic "db error" display.
fn db_message(e: &tokio_postgres::Error, fallback: String) -> String {
  e.as_db_error()
    .map(|db| format!("{} ({})", db.message(), db.code().code()))
    .unwrap_or(fallback)
}

impl Error {
  /// DDL outcomes that mean "the object is already there": duplicate table,
  /// column or index, plus PostgreSQL's unique violation on its own catalog
  /// when two sessions create the same table at once.
  pub fn is_already_exists(&self) -> bool {
    match self {
      Error::AlreadyExists(_) => true,
      Error::Constraint(message) => message.ends_with("(23505)"),
      _ => false,
    }
  }
}
