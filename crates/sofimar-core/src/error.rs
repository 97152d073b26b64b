//! Error types for `sofimar-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("rating must be between 1 and 5, got {0}")]
  InvalidRating(i64),

  #[error("missing required field: {0}")]
  MissingField(&'static str),

  #[error("invalid field {field}: {reason}")]
  InvalidField {
    field:  &'static str,
    reason: String,
  },

  #[error("document must be a JSON object")]
  NotAnObject,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification shared by every storage error type.
///
/// The HTTP layer maps these onto status codes without knowing which
/// backend produced the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Backend unreachable or authentication failed.
  Connection,
  /// DDL failed for a reason other than "already exists".
  Schema,
  /// Unique, check or not-null constraint rejected a write.
  Constraint,
  /// Input rejected before reaching storage.
  Validation,
  /// Syntax errors, missing tables and everything else the backend reports.
  Query,
  Internal,
}

/// Implemented by storage error types so callers can classify them.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn kind(&self) -> ErrorKind;
}

impl StoreError for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::Serialization(_) => ErrorKind::Internal,
      _ => ErrorKind::Validation,
    }
  }
}

impl StoreError for std::convert::Infallible {
  fn kind(&self) -> ErrorKind { match *self {} }
}
