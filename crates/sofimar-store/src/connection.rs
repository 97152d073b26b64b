//! One connection interface over both backends.
//!
//! Callers write SQL with neutral `?` placeholders; [`Connection`] rewrites it
//! for the active dialect and normalises results into [`Row`]s.

use std::sync::Arc;

use sofimar_core::BackendKind;

use crate::{
  Error, Result,
  dialect,
  embedded::EmbeddedConnection,
  networked::NetworkedConnection,
  value::{Row, Value},
};

/// Whether a statement is expected to return rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Fetch,
  Commit,
}

#[derive(Debug, Default)]
pub struct QueryResult {
  pub rows:     Vec<Row>,
  pub affected: u64,
}

enum Inner {
  Embedded(EmbeddedConnection),
  Networked(Arc<NetworkedConnection>),
}

/// A connection handed out by [`Storage::acquire`](crate::Storage::acquire).
pub struct Connection {
  inner:    Inner,
  fallback: bool,
}

impl Connection {
  pub(crate) fn embedded(conn: EmbeddedConnection, fallback: bool) -> Self {
    Self { inner: Inner::Embedded(conn), fallback }
  }

  pub(crate) fn networked(conn: Arc<NetworkedConnection>) -> Self {
    Self { inner: Inner::Networked(conn), fallback: false }
  }

  pub fn kind(&self) -> BackendKind {
    match self.inner {
      Inner::Embedded(_) => BackendKind::Embedded,
      Inner::Networked(_) => BackendKind::Networked,
    }
  }

  /// True when the networked backend was selected but unreachable and this
  /// call was served by the embedded database instead.
  pub fn is_fallback(&self) -> bool { self.fallback }

  pub async fn execute(&self, sql: &str, params: Vec<Value>, mode: Mode) -> Result<QueryResult> {
    let sql = dialect::translate_placeholders(sql, self.kind());
    tracing::trace!(backend = %self.kind(), sql = %sql, params = params.len(), "execute");
    match &self.inner {
      Inner::Embedded(conn) => conn.execute(sql.into_owned(), params, mode).await,
      Inner::Networked(conn) => conn.execute(&sql, &params, mode).await,
    }
  }

  pub async fn fetch(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Row>> {
    Ok(self.execute(sql, params, Mode::Fetch).await?.rows)
  }

  pub async fn fetch_optional(&self, sql: &str, params: Vec<Value>) -> Result<Option<Row>> {
    Ok(self.fetch(sql, params).await?.into_iter().next())
  }

  /// Run a statement and return the number of affected rows.
  pub async fn commit(&self, sql: &str, params: Vec<Value>) -> Result<u64> {
    Ok(self.execute(sql, params, Mode::Commit).await?.affected)
  }

  /// Insert a row, replacing any existing row with the same `key`.
  pub async fn insert_or_replace(
    &self,
    table: &str,
    key: &str,
    columns: &[&str],
    values: Vec<Value>,
  ) -> Result<u64> {
    if columns.len() != values.len() {
      return Err(Error::Query(format!(
        "{table}: {} columns but {} values",
        columns.len(),
        values.len()
      )));
    }
    let sql = dialect::insert_or_replace(self.kind(), table, &[key], columns);
    self.commit(&sql, values).await
  }

  /// Add one to `counter` in the row keyed by `key`, creating the row at 1,
  /// and return the new value.
  pub async fn increment(
    &self,
    table: &str,
    key_column: &str,
    counter_column: &str,
    key: Value,
  ) -> Result<i64> {
    let sql = dialect::increment(self.kind(), table, key_column, counter_column);
    let row = self
      .fetch_optional(&sql, vec![key])
      .await?
      .ok_or_else(|| Error::Query(format!("{table}: increment returned no row")))?;
    row.int(counter_column)
  }

  /// Run parameterless statements verbatim (DDL).
  pub async fn batch(&self, sql: &str) -> Result<()> {
    match &self.inner {
      Inner::Embedded(conn) => conn.batch(sql.to_owned()).await,
      Inner::Networked(conn) => conn.batch(sql).await,
    }
  }

  pub(crate) async fn close(self) -> Result<()> {
    match self.inner {
      Inner::Embedded(conn) => conn.close().await,
      Inner::Networked(_) => Ok(()),
    }
  }
}
