//! Backend selection from the process environment.

use sofimar_core::BackendKind;

/// Variables naming a networked database URL, highest priority first.
pub const URL_VARIABLES: [&str; 5] = [
  "NEON_DB_URL",
  "DATABASE_URL",
  "POSTGRES_URL",
  "POSTGRES_PRISMA_URL",
  "POSTGRES_URL_NON_POOLING",
];

/// The outcome of backend selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
  pub kind:   BackendKind,
  /// Connection URL when `kind` is networked.
  pub url:    Option<String>,
  /// Which variable supplied the URL.
  pub source: Option<&'static str>,
}

impl Selection {
  pub fn embedded() -> Self {
    Self { kind: BackendKind::Embedded, url: None, source: None }
  }
}

/// Pick the backend from a variable lookup. The first variable with a
/// non-blank value wins; with none set the embedded backend is used.
pub fn select_backend(lookup: impl Fn(&str) -> Option<String>) -> Selection {
  for name in URL_VARIABLES {
    if let Some(url) = lookup(name) {
      let url = url.trim();
      if !url.is_empty() {
        return Selection {
          kind:   BackendKind::Networked,
          url:    Some(url.to_owned()),
          source: Some(name),
        };
      }
    }
  }
  Selection::embedded()
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
      .iter()
      .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
      .collect();
    move |name| map.get(name).cloned()
  }

  #[test]
  fn nothing_set_selects_embedded() {
    assert_eq!(select_backend(lookup(&[])), Selection::embedded());
  }

  #[test]
  fn priority_order_is_respected() {
    let sel = select_backend(lookup(&[
      ("POSTGRES_URL", "postgres://b"),
      ("DATABASE_URL", "postgres://a"),
    ]));
    assert_eq!(sel.kind, BackendKind::Networked);
    assert_eq!(sel.url.as_deref(), Some("postgres://a"));
    assert_eq!(sel.source, Some("DATABASE_URL"));
  }

  #[test]
  fn blank_values_are_skipped() {
    let sel = select_backend(lookup(&[
      ("NEON_DB_URL", "   "),
      ("POSTGRES_URL_NON_POOLING", " postgres://c "),
    ]));
    assert_eq!(sel.url.as_deref(), Some("postgres://c"));
  }
}
