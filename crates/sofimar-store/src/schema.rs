//! Idempotent schema creation for both dialects.
//!
//! Migrations only ever add: tables, late columns, and indexes. Nothing is
//! dropped or renamed.

use sofimar_core::{BackendKind, document::DEFAULT_CERTIFICATE_TYPE};

use crate::{
  Connection, Error, Result,
  dialect::{ColumnType, column_type, flag_literal},
};

// ─── Definitions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum DefaultValue {
  None,
  Text(&'static str),
  Int(i64),
  Flag(bool),
}

#[derive(Debug, Clone, Copy)]
struct ColumnDef {
  name:     &'static str,
  ty:       ColumnType,
  primary:  bool,
  not_null: bool,
  default:  DefaultValue,
}

const fn key(name: &'static str, ty: ColumnType) -> ColumnDef {
  ColumnDef { name, ty, primary: true, not_null: false, default: DefaultValue::None }
}

const fn required(name: &'static str, ty: ColumnType) -> ColumnDef {
  ColumnDef { name, ty, primary: false, not_null: true, default: DefaultValue::None }
}

const fn optional(name: &'static str, ty: ColumnType) -> ColumnDef {
  ColumnDef { name, ty, primary: false, not_null: false, default: DefaultValue::None }
}

const fn defaulted(name: &'static str, ty: ColumnType, default: DefaultValue) -> ColumnDef {
  ColumnDef { name, ty, primary: false, not_null: true, default }
}

struct TableDef {
  name:      &'static str,
  columns:   &'static [ColumnDef],
  /// Holds at most one row, `id = 1`.
  singleton: bool,
}

const DOCUMENT_COLUMNS: &[ColumnDef] = &[
  key("id", ColumnType::Text),
  required("data", ColumnType::Text),
  required("timestamp", ColumnType::Text),
];

const SINGLETON_COLUMNS: &[ColumnDef] = &[
  key("id", ColumnType::Integer),
  required("data", ColumnType::Text),
  required("last_updated", ColumnType::Text),
];

const fn document_table(name: &'static str) -> TableDef {
  TableDef { name, columns: DOCUMENT_COLUMNS, singleton: false }
}

const fn json_singleton(name: &'static str) -> TableDef {
  TableDef { name, columns: SINGLETON_COLUMNS, singleton: true }
}

const CERTIFICATE_TYPE: ColumnDef =
  defaulted("type", ColumnType::Text, DefaultValue::Text(DEFAULT_CERTIFICATE_TYPE));
const REVIEW_APPROVED: ColumnDef =
  defaulted("approved", ColumnType::Flag, DefaultValue::Flag(false));

const TABLES: &[TableDef] = &[
  document_table("messages"),
  TableDef {
    name:      "certificates",
    columns:   &[
      key("id", ColumnType::Text),
      required("data", ColumnType::Text),
      CERTIFICATE_TYPE,
      required("timestamp", ColumnType::Text),
    ],
    singleton: false,
  },
  document_table("partners"),
  TableDef {
    name:      "reviews",
    columns:   &[
      key("id", ColumnType::Text),
      required("name", ColumnType::Text),
      required("rating", ColumnType::Integer),
      optional("comment", ColumnType::Text),
      optional("date", ColumnType::Text),
      REVIEW_APPROVED,
      required("timestamp", ColumnType::Text),
    ],
    singleton: false,
  },
  TableDef {
    name:      "chatbot_messages",
    columns:   &[
      ColumnDef {
        name:     "id",
        ty:       ColumnType::AutoId,
        primary:  false,
        not_null: false,
        default:  DefaultValue::None,
      },
      required("data", ColumnType::Text),
      required("timestamp", ColumnType::Text),
    ],
    singleton: false,
  },
  TableDef {
    name:      "chatbot_responses",
    columns:   &[
      key("keyword", ColumnType::Text),
      required("response", ColumnType::Text),
      required("timestamp", ColumnType::Text),
    ],
    singleton: false,
  },
  json_singleton("site_texts"),
  json_singleton("tiktok_videos"),
  json_singleton("locations"),
  TableDef {
    name:      "admin_password",
    columns:   &[
      key("id", ColumnType::Integer),
      required("password", ColumnType::Text),
      required("last_updated", ColumnType::Text),
    ],
    singleton: true,
  },
  TableDef {
    name:      "visits",
    columns:   &[
      key("date", ColumnType::Text),
      defaulted("count", ColumnType::Integer, DefaultValue::Int(0)),
    ],
    singleton: false,
  },
];

/// Columns added after the first release; older databases gain them via
/// `ALTER TABLE`.
const LATE_COLUMNS: &[(&str, ColumnDef)] =
  &[("certificates", CERTIFICATE_TYPE), ("reviews", REVIEW_APPROVED)];

/// Indexes on the columns lists are ordered by.
const INDEXES: &[(&str, &str, &str)] = &[
  ("idx_messages_timestamp", "messages", "timestamp"),
  ("idx_chatbot_messages_timestamp", "chatbot_messages", "timestamp"),
  ("idx_certificates_timestamp", "certificates", "timestamp"),
  ("idx_partners_timestamp", "partners", "timestamp"),
  ("idx_reviews_timestamp", "reviews", "timestamp"),
];

// ─── Rendering ───────────────────────────────────────────────────────────────

fn render_column(kind: BackendKind, col: &ColumnDef) -> String {
  let mut sql = format!("{} {}", col.name, column_type(kind, col.ty));
  if col.primary {
    sql.push_str(" PRIMARY KEY");
  }
  if col.not_null {
    sql.push_str(" NOT NULL");
  }
  match col.default {
    DefaultValue::None => {}
    DefaultValue::Text(t) => sql.push_str(&format!(" DEFAULT '{t}'")),
    DefaultValue::Int(i) => sql.push_str(&format!(" DEFAULT {i}")),
    DefaultValue::Flag(b) => sql.push_str(&format!(" DEFAULT {}", flag_literal(kind, b))),
  }
  sql
}

fn create_table_sql(kind: BackendKind, table: &TableDef, with_check: bool) -> String {
  let mut parts: Vec<String> = table.columns.iter().map(|c| render_column(kind, c)).collect();
  if table.singleton && with_check {
    parts.push("CHECK (id = 1)".to_owned());
  }
  format!("CREATE TABLE IF NOT EXISTS {} ({})", table.name, parts.join(", "))
}

// ─── Migration ───────────────────────────────────────────────────────────────

/// What a migration run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
  pub tables:        usize,
  pub columns_added: usize,
  pub indexes:       usize,
  /// Singleton tables created without their `CHECK (id = 1)` constraint.
  pub unconstrained: Vec<&'static str>,
}

/// Bring the schema up to date on `conn`. Safe to run repeatedly and
/// concurrently.
pub async fn ensure_schema(conn: &Connection) -> Result<SchemaReport> {
  let kind = conn.kind();
  let mut report = SchemaReport::default();

  for table in TABLES {
    if create_table(kind, table, |sql| async move { conn.batch(&sql).await }).await? {
      report.unconstrained.push(table.name);
    }
    report.tables += 1;
  }

  for (table, column) in LATE_COLUMNS {
    let sql = format!("ALTER TABLE {table} ADD COLUMN {}", render_column(kind, column));
    match conn.batch(&sql).await {
      Ok(()) => {
        tracing::info!(table, column = column.name, "added column");
        report.columns_added += 1;
      }
      Err(e) if e.is_already_exists() => {}
      Err(e) => {
        return Err(Error::Schema(format!("add {table}.{}: {e}", column.name)));
      }
    }
  }

  for (name, table, column) in INDEXES {
    let sql = format!("CREATE INDEX IF NOT EXISTS {name} ON {table} ({column})");
    match tolerate_existing(conn.batch(&sql).await) {
      Ok(()) => report.indexes += 1,
      Err(e) => tracing::warn!(index = name, error = %e, "index creation failed"),
    }
  }

  tracing::debug!(backend = %kind, ?report, "schema ensured");
  Ok(report)
}

/// Create `table` through `run`. A singleton whose `CHECK (id = 1)` is
/// rejected is created again without it; returns whether that happened.
async fn create_table<F, Fut>(kind: BackendKind, table: &TableDef, mut run: F) -> Result<bool>
where
  F: FnMut(String) -> Fut,
  Fut: Future<Output = Result<()>>,
{
  match tolerate_existing(run(create_table_sql(kind, table, true)).await) {
    Ok(()) => Ok(false),
    Err(e) if table.singleton => {
      tracing::warn!(
        table = table.name,
        error = %e,
        "singleton table rejected CHECK constraint; creating without it"
      );
      tolerate_existing(run(create_table_sql(kind, table, false)).await)
        .map_err(|e| Error::Schema(format!("create {}: {e}", table.name)))?;
      Ok(true)
    }
    Err(e) => Err(Error::Schema(format!("create {}: {e}", table.name))),
  }
}

fn tolerate_existing(result: Result<()>) -> Result<()> {
  match result {
    Err(e) if e.is_already_exists() => Ok(()),
    other => other,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn table(name: &str) -> &'static TableDef {
    TABLES.iter().find(|t| t.name == name).unwrap()
  }

  #[test]
  fn eleven_tables() {
    assert_eq!(TABLES.len(), 11);
  }

  #[test]
  fn singleton_check_is_optional() {
    let t = table("site_texts");
    let with = create_table_sql(BackendKind::Embedded, t, true);
    let without = create_table_sql(BackendKind::Embedded, t, false);
    assert!(with.ends_with("CHECK (id = 1))"), "{with}");
    assert!(!without.contains("CHECK"));
  }

  async fn create_rejecting_check(name: &str) -> (Result<bool>, Vec<String>) {
    let mut issued = Vec::new();
    let result = create_table(BackendKind::Networked, table(name), |sql: String| {
      let rejected = sql.contains("CHECK");
      issued.push(sql);
      async move {
        if rejected {
          Err(Error::Query("syntax error at or near \"CHECK\"".to_owned()))
        } else {
          Ok(())
        }
      }
    })
    .await;
    (result, issued)
  }

  #[tokio::test]
  async fn singleton_is_recreated_without_check() {
    let (result, issued) = create_rejecting_check("site_texts").await;
    assert!(result.unwrap());
    assert_eq!(issued.len(), 2);
    assert!(issued[0].contains("CHECK (id = 1)"));
    assert!(!issued[1].contains("CHECK"));
  }

  #[tokio::test]
  async fn accepted_singleton_keeps_check() {
    let mut issued = Vec::new();
    let dropped = create_table(BackendKind::Networked, table("site_texts"), |sql: String| {
      issued.push(sql);
      async { Ok(()) }
    })
    .await
    .unwrap();
    assert!(!dropped);
    assert_eq!(issued.len(), 1);
  }

  #[tokio::test]
  async fn document_table_errors_are_not_retried() {
    let mut issued = 0;
    let result = create_table(BackendKind::Networked, table("partners"), |_sql: String| {
      issued += 1;
      async { Err(Error::Query("permission denied".to_owned())) }
    })
    .await;
    assert!(matches!(result, Err(Error::Schema(_))), "{result:?}");
    assert_eq!(issued, 1);
  }

  #[test]
  fn auto_increment_per_dialect() {
    let t = table("chatbot_messages");
    assert!(
      create_table_sql(BackendKind::Embedded, t, true)
        .contains("id INTEGER PRIMARY KEY AUTOINCREMENT")
    );
    assert!(create_table_sql(BackendKind::Networked, t, true).contains("id SERIAL PRIMARY KEY"));
  }

  #[test]
  fn flag_defaults_per_dialect() {
    assert_eq!(
      render_column(BackendKind::Embedded, &REVIEW_APPROVED),
      "approved INTEGER NOT NULL DEFAULT 0"
    );
    assert_eq!(
      render_column(BackendKind::Networked, &REVIEW_APPROVED),
      "approved BOOLEAN NOT NULL DEFAULT FALSE"
    );
    assert_eq!(
      render_column(BackendKind::Embedded, &CERTIFICATE_TYPE),
      "type TEXT NOT NULL DEFAULT 'certificat'"
    );
  }
}
