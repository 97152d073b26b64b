//! The embedded backend: a SQLite file accessed through `tokio-rusqlite`.
//!
//! A fresh connection is opened for every acquire and closed on release, so
//! several processes may share the same file. Contention is absorbed by
//! SQLite's busy timeout.

use std::{path::Path, sync::Arc, time::Duration};

use rusqlite::types::ValueRef;

use crate::{
  Result,
  connection::{Mode, QueryResult},
  value::{Row, Value},
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct EmbeddedConnection {
  conn: tokio_rusqlite::Connection,
}

impl EmbeddedConnection {
  /// Open (or create) the database file at `path`.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn })
  }

  pub async fn execute(&self, sql: String, params: Vec<Value>, mode: Mode) -> Result<QueryResult> {
    let (columns, raw, affected) = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let args = rusqlite::params_from_iter(params.iter());

        if mode == Mode::Commit {
          let affected = stmt.execute(args)?;
          return Ok((Vec::new(), Vec::new(), affected));
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
        let width = columns.len();
        let mut rows = stmt.query(args)?;
        let mut raw: Vec<Vec<rusqlite::types::Value>> = Vec::new();
        while let Some(row) = rows.next()? {
          let mut values = Vec::with_capacity(width);
          for i in 0..width {
            values.push(row.get::<_, rusqlite::types::Value>(i)?);
          }
          raw.push(values);
        }
        Ok((columns, raw, 0))
      })
      .await?;

    let columns: Arc<[String]> = columns.into();
    let rows = raw
      .iter()
      .map(|values| {
        let values = values
          .iter()
          .map(|v| Value::from_sqlite(ValueRef::from(v)))
          .collect::<Result<Vec<_>>>()?;
        Ok(Row::new(columns.clone(), values))
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(QueryResult { rows, affected: affected as u64 })
  }

  /// Run one or more statements without parameters.
  pub async fn batch(&self, sql: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }
}
