//! The networked backend: PostgreSQL over `tokio-postgres` with TLS from
//! `native-tls`.

use std::{sync::Arc, time::Duration};

use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::types::ToSql;

use crate::{
  Error, Result,
  connection::{Mode, QueryResult},
  value::{Row, Value},
};

/// URL query parameters understood by hosted providers or ORMs but rejected
/// by the `tokio-postgres` parser.
const IGNORED_PARAMS: [&str; 4] = ["pgbouncer", "schema", "connection_limit", "pool_timeout"];

pub struct NetworkedConnection {
  client: tokio_postgres::Client,
}

impl NetworkedConnection {
  /// Connect to `url`, giving up after `timeout`.
  ///
  /// Every failure, including URL parse errors, is reported as
  /// [`Error::Connection`] so the caller can fall back.
  pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
    let mut config: tokio_postgres::Config = strip_ignored_params(url)
      .parse()
      .map_err(|e: tokio_postgres::Error| Error::Connection(format!("invalid database url: {e}")))?;
    config.connect_timeout(timeout);

    let tls = native_tls::TlsConnector::new()
      .map_err(|e| Error::Connection(format!("tls setup failed: {e}")))?;

    let (client, connection) =
      tokio::time::timeout(timeout, config.connect(MakeTlsConnector::new(tls)))
        .await
        .map_err(|_| Error::Connection(format!("connect timed out after {timeout:?}")))?
        .map_err(|e| Error::Connection(e.to_string()))?;

    tokio::spawn(async move {
      if let Err(e) = connection.await {
        tracing::warn!(error = %e, "networked connection terminated");
      }
    });

    Ok(Self { client })
  }

  /// Liveness check used before reusing a cached connection. A server that
  /// stops answering counts as dead once `timeout` elapses.
  pub async fn ping(&self, timeout: Duration) -> Result<()> {
    if self.client.is_closed() {
      return Err(Error::Connection("connection closed".to_owned()));
    }
    tokio::time::timeout(timeout, self.client.simple_query("SELECT 1"))
      .await
      .map_err(|_| Error::Connection(format!("liveness check timed out after {timeout:?}")))?
      .map_err(|e| Error::Connection(e.to_string()))?;
    Ok(())
  }

  pub async fn execute(&self, sql: &str, params: &[Value], mode: Mode) -> Result<QueryResult> {
    let args: Vec<&(dyn ToSql + Sync)> =
      params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

    if mode == Mode::Commit {
      let affected = self.client.execute(sql, &args).await?;
      return Ok(QueryResult { rows: Vec::new(), affected });
    }

    let statement = self.client.prepare(sql).await?;
    let columns: Arc<[String]> = statement
      .columns()
      .iter()
      .map(|c| c.name().to_owned())
      .collect();

    let rows = self
      .client
      .query(&statement, &args)
      .await?
      .iter()
      .map(|row| {
        let values = (0..columns.len())
          .map(|i| Value::from_postgres(row, i))
          .collect::<Result<Vec<_>>>()?;
        Ok(Row::new(columns.clone(), values))
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(QueryResult { rows, affected: 0 })
  }

  pub async fn batch(&self, sql: &str) -> Result<()> {
    self.client.batch_execute(sql).await?;
    Ok(())
  }
}

fn strip_ignored_params(url: &str) -> String {
  let Some((base, query)) = url.split_once('?') else {
    return url.to_owned();
  };
  let kept: Vec<&str> = query
    .split('&')
    .filter(|pair| {
      let key = pair.split_once('=').map_or(*pair, |(k, _)| k);
      !pair.is_empty() && !IGNORED_PARAMS.contains(&key)
    })
    .collect();
  if kept.is_empty() {
    base.to_owned()
  } else {
    format!("{base}?{}", kept.join("&"))
  }
}
