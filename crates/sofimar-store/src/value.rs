//! Backend-neutral parameter values and result rows.
//!
//! Both backends convert into and out of these types at their boundary, so
//! nothing above the query layer touches `rusqlite` or `tokio_postgres`
//! types.

use std::{error::Error as StdError, sync::Arc};

use bytes::BytesMut;
use rusqlite::types::{ToSqlOutput, ValueRef};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

use crate::{Error, Result};

// ─── Value ───────────────────────────────────────────────────────────────────

/// A single SQL parameter or column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Null,
  Integer(i64),
  Real(f64),
  Text(String),
  Bool(bool),
}

impl From<i64> for Value {
  fn from(v: i64) -> Self { Value::Integer(v) }
}

impl From<u8> for Value {
  fn from(v: u8) -> Self { Value::Integer(i64::from(v)) }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self { Value::Bool(v) }
}

impl From<String> for Value {
  fn from(v: String) -> Self { Value::Text(v) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Value::Text(v.to_owned()) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self { v.map_or(Value::Null, Into::into) }
}

// SQLite has no boolean type; flags are stored as 0/1 integers.
impl rusqlite::ToSql for Value {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(match self {
      Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
      Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
      Value::Real(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
      Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
      Value::Bool(b) => ToSqlOutput::Borrowed(ValueRef::Integer(i64::from(*b))),
    })
  }
}

impl Value {
  pub(crate) fn from_sqlite(value: ValueRef<'_>) -> Result<Self> {
    Ok(match value {
      ValueRef::Null => Value::Null,
      ValueRef::Integer(i) => Value::Integer(i),
      ValueRef::Real(f) => Value::Real(f),
      ValueRef::Text(bytes) => Value::Text(
        std::str::from_utf8(bytes)
          .map_err(|e| Error::Query(format!("invalid utf-8 in text column: {e}")))?
          .to_owned(),
      ),
      ValueRef::Blob(_) => {
        return Err(Error::Query("blob columns are not supported".to_owned()));
      }
    })
  }

  pub(crate) fn from_postgres(row: &tokio_postgres::Row, idx: usize) -> Result<Self> {
    let ty = row.columns()[idx].type_().clone();
    let value = match ty {
      Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool),
      Type::INT2 => row
        .try_get::<_, Option<i16>>(idx)?
        .map(|v| Value::Integer(i64::from(v))),
      Type::INT4 => row
        .try_get::<_, Option<i32>>(idx)?
        .map(|v| Value::Integer(i64::from(v))),
      Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(Value::Integer),
      Type::FLOAT4 => row
        .try_get::<_, Option<f32>>(idx)?
        .map(|v| Value::Real(f64::from(v))),
      Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(Value::Real),
      _ => row.try_get::<_, Option<String>>(idx)?.map(Value::Text),
    };
    Ok(value.unwrap_or(Value::Null))
  }
}

// PostgreSQL binds parameters with the types the server inferred for the
// statement, so integers are narrowed and flags widened to match the column.
impl ToSql for Value {
  fn to_sql(
    &self,
    ty: &Type,
    out: &mut BytesMut,
  ) -> std::result::Result<IsNull, Box<dyn StdError + Sync + Send>> {
    match self {
      Value::Null => Ok(IsNull::Yes),
      Value::Bool(b) => match *ty {
        Type::INT2 => i16::from(*b).to_sql(ty, out),
        Type::INT4 => i32::from(*b).to_sql(ty, out),
        Type::INT8 => i64::from(*b).to_sql(ty, out),
        _ => b.to_sql(ty, out),
      },
      Value::Integer(i) => match *ty {
        Type::BOOL => (*i != 0).to_sql(ty, out),
        Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
        Type::FLOAT8 => (*i as f64).to_sql(ty, out),
        Type::TEXT | Type::VARCHAR => i.to_string().to_sql(ty, out),
        _ => i.to_sql(ty, out),
      },
      Value::Real(f) => match *ty {
        Type::FLOAT4 => (*f as f32).to_sql(ty, out),
        Type::TEXT | Type::VARCHAR => f.to_string().to_sql(ty, out),
        _ => f.to_sql(ty, out),
      },
      Value::Text(s) => s.to_sql(ty, out),
    }
  }

  fn accepts(_ty: &Type) -> bool { true }

  to_sql_checked!();
}

// ─── Row ─────────────────────────────────────────────────────────────────────

/// One result row: ordered column names with their values.
///
/// Column names are shared between the rows of a single result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
  columns: Arc<[String]>,
  values:  Vec<Value>,
}

impl Row {
  pub(crate) fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
    Self { columns, values }
  }

  pub fn columns(&self) -> &[String] { &self.columns }

  /// Iterate `(column, value)` pairs in select order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.columns.iter().map(String::as_str).zip(self.values.iter())
  }

  pub fn get(&self, column: &str) -> Option<&Value> {
    self
      .columns
      .iter()
      .position(|c| c.eq_ignore_ascii_case(column))
      .and_then(|i| self.values.get(i))
  }

  fn require(&self, column: &str) -> Result<&Value> {
    self.get(column).ok_or_else(|| Error::Column {
      column: column.to_owned(),
      reason: "not in result set".to_owned(),
    })
  }

  pub fn text(&self, column: &str) -> Result<String> {
    self
      .opt_text(column)?
      .ok_or_else(|| mismatch(column, "text", &Value::Null))
  }

  pub fn opt_text(&self, column: &str) -> Result<Option<String>> {
    match self.require(column)? {
      Value::Null => Ok(None),
      Value::Text(s) => Ok(Some(s.clone())),
      Value::Integer(i) => Ok(Some(i.to_string())),
      other => Err(mismatch(column, "text", other)),
    }
  }

  pub fn int(&self, column: &str) -> Result<i64> {
    match self.require(column)? {
      Value::Integer(i) => Ok(*i),
      Value::Bool(b) => Ok(i64::from(*b)),
      Value::Text(s) => s.parse().map_err(|_| mismatch(column, "integer", &Value::Text(s.clone()))),
      other => Err(mismatch(column, "integer", other)),
    }
  }

  /// Accepts native booleans as well as SQLite's 0/1 integers.
  pub fn bool(&self, column: &str) -> Result<bool> {
    match self.require(column)? {
      Value::Bool(b) => Ok(*b),
      Value::Integer(i) => Ok(*i != 0),
      Value::Null => Ok(false),
      other => Err(mismatch(column, "boolean", other)),
    }
  }
}

fn mismatch(column: &str, expected: &str, got: &Value) -> Error {
  Error::Column {
    column: column.to_owned(),
    reason: format!("expected {expected}, found {got:?}"),
  }
}
