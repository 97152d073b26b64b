//! SQL dialect differences between the embedded (SQLite) and networked
//! (PostgreSQL) backends.
//!
//! Call sites write SQL with `?` placeholders and describe upserts as
//! operations; everything dialect-specific is decided here.

use std::borrow::Cow;

use sofimar_core::BackendKind;

// ─── Placeholders ────────────────────────────────────────────────────────────

/// Rewrite neutral `?` placeholders into the backend's native syntax.
///
/// SQLite accepts `?` as-is. PostgreSQL needs `$1..$n`. Question marks inside
/// single-quoted literals or double-quoted identifiers are left alone.
pub fn translate_placeholders(sql: &str, kind: BackendKind) -> Cow<'_, str> {
  if kind == BackendKind::Embedded || !sql.contains('?') {
    return Cow::Borrowed(sql);
  }

  let mut out       = String::with_capacity(sql.len() + 8);
  let mut n         = 0usize;
  let mut in_single = false;
  let mut in_double = false;

  for ch in sql.chars() {
    match ch {
      '\'' if !in_double => in_single = !in_single,
      '"' if !in_single => in_double = !in_double,
      '?' if !in_single && !in_double => {
        n += 1;
        out.push('$');
        out.push_str(&n.to_string());
        continue;
      }
      _ => {}
    }
    out.push(ch);
  }

  Cow::Owned(out)
}

// ─── Upserts ─────────────────────────────────────────────────────────────────

/// Lower an insert-or-replace into a neutral-placeholder statement.
///
/// Embedded: `INSERT OR REPLACE`. Networked: `INSERT … ON CONFLICT (key) DO
/// UPDATE SET` every non-key column from `EXCLUDED`.
pub fn insert_or_replace(
  kind:    BackendKind,
  table:   &str,
  key:     &[&str],
  columns: &[&str],
) -> String {
  let column_list  = columns.join(", ");
  let placeholders = vec!["?"; columns.len()].join(", ");

  match kind {
    BackendKind::Embedded => {
      format!("INSERT OR REPLACE INTO {table} ({column_list}) VALUES ({placeholders})")
    }
    BackendKind::Networked => {
      let updates: Vec<String> = columns
        .iter()
        .filter(|c| !key.contains(c))
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();
      let action = if updates.is_empty() {
        "DO NOTHING".to_owned()
      } else {
        format!("DO UPDATE SET {}", updates.join(", "))
      };
      format!(
        "INSERT INTO {table} ({column_list}) VALUES ({placeholders}) ON CONFLICT ({}) {action}",
        key.join(", "),
      )
    }
  }
}

/// Lower "add one to the counter for this key" into a single statement that
/// returns the new count. Takes one parameter: the key value.
pub fn increment(
  kind:    BackendKind,
  table:   &str,
  key:     &str,
  counter: &str,
) -> String {
  // PostgreSQL requires the existing row to be qualified by table name.
  let current = match kind {
    BackendKind::Embedded => counter.to_owned(),
    BackendKind::Networked => format!("{table}.{counter}"),
  };
  format!(
    "INSERT INTO {table} ({key}, {counter}) VALUES (?, 1) \
     ON CONFLICT ({key}) DO UPDATE SET {counter} = {current} + 1 \
     RETURNING {counter}"
  )
}

// ─── DDL types ───────────────────────────────────────────────────────────────

/// Logical column types used by the schema definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
  Text,
  Integer,
  /// Boolean flag; stored as 0/1 on SQLite.
  Flag,
  /// Auto-increment integer primary key.
  AutoId,
}

pub fn column_type(kind: BackendKind, ty: ColumnType) -> &'static str {
  match (kind, ty) {
    (_, ColumnType::Text) => "TEXT",
    (_, ColumnType::Integer) => "INTEGER",
    (BackendKind::Embedded, ColumnType::Flag) => "INTEGER",
    (BackendKind::Networked, ColumnType::Flag) => "BOOLEAN",
    (BackendKind::Embedded, ColumnType::AutoId) => "INTEGER PRIMARY KEY AUTOINCREMENT",
    (BackendKind::Networked, ColumnType::AutoId) => "SERIAL PRIMARY KEY",
  }
}

/// Literal for a flag default in the backend's syntax.
pub fn flag_literal(kind: BackendKind, value: bool) -> &'static str {
  match (kind, value) {
    (BackendKind::Embedded, false) => "0",
    (BackendKind::Embedded, true) => "1",
    (BackendKind::Networked, false) => "FALSE",
    (BackendKind::Networked, true) => "TRUE",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Count neutral placeholders outside quoted text.
  fn placeholder_count(sql: &str) -> usize {
    let mut n         = 0;
    let mut in_single = false;
    let mut in_double = false;
    for ch in sql.chars() {
      match ch {
        '\'' if !in_double => in_single = !in_single,
        '"' if !in_single => in_double = !in_double,
        '?' if !in_single && !in_double => n += 1,
        _ => {}
      }
    }
    n
  }

  #[test]
  fn embedded_placeholders_untouched() {
    let sql = "SELECT * FROM t WHERE a = ? AND b = ?";
    assert!(matches!(translate_placeholders(sql, BackendKind::Embedded), Cow::Borrowed(_)));
  }

  #[test]
  fn networked_placeholders_numbered() {
    let sql = "INSERT INTO t (a, b, c) VALUES (?, ?, ?)";
    assert_eq!(
      translate_placeholders(sql, BackendKind::Networked),
      "INSERT INTO t (a, b, c) VALUES ($1, $2, $3)"
    );
  }

  #[test]
  fn quoted_question_marks_survive() {
    let sql = "SELECT '?', \"we?rd\" FROM t WHERE x = ? AND y = 'it''s ?'";
    assert_eq!(
      translate_placeholders(sql, BackendKind::Networked),
      "SELECT '?', \"we?rd\" FROM t WHERE x = $1 AND y = 'it''s ?'"
    );
    assert_eq!(placeholder_count(sql), 1);
  }

  #[test]
  fn upsert_lowering_per_dialect() {
    let cols = ["id", "data", "type", "timestamp"];
    assert_eq!(
      insert_or_replace(BackendKind::Embedded, "certificates", &["id"], &cols),
      "INSERT OR REPLACE INTO certificates (id, data, type, timestamp) VALUES (?, ?, ?, ?)"
    );
    assert_eq!(
      insert_or_replace(BackendKind::Networked, "certificates", &["id"], &cols),
      "INSERT INTO certificates (id, data, type, timestamp) VALUES (?, ?, ?, ?) \
       ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, type = EXCLUDED.type, \
       timestamp = EXCLUDED.timestamp"
    );
  }

  #[test]
  fn upsert_with_only_key_columns_does_nothing_on_conflict() {
    let sql = insert_or_replace(BackendKind::Networked, "t", &["k"], &["k"]);
    assert!(sql.ends_with("ON CONFLICT (k) DO NOTHING"), "{sql}");
  }

  #[test]
  fn increment_qualifies_counter_on_networked() {
    let pg = increment(BackendKind::Networked, "visits", "date", "count");
    assert!(pg.contains("SET count = visits.count + 1"), "{pg}");
    let lite = increment(BackendKind::Embedded, "visits", "date", "count");
    assert!(lite.contains("SET count = count + 1"), "{lite}");
    assert_eq!(placeholder_count(&lite), 1);
  }

  #[test]
  fn ddl_types_differ_by_dialect() {
    assert_eq!(column_type(BackendKind::Embedded, ColumnType::Flag), "INTEGER");
    assert_eq!(column_type(BackendKind::Networked, ColumnType::Flag), "BOOLEAN");
    assert_eq!(column_type(BackendKind::Networked, ColumnType::AutoId), "SERIAL PRIMARY KEY");
  }
}
