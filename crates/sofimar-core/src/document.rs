//! Documents: opaque JSON payloads stored in an `(id, data, timestamp)`
//! envelope.
//!
//! The storage layer never looks inside a document except for the handful of
//! fields promoted to relational columns (`id`, `timestamp`, and `type` for
//! certificates).

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Error, Result};

/// Certificate `type` used when the payload does not carry one.
pub const DEFAULT_CERTIFICATE_TYPE: &str = "certificat";

// ─── Collection ──────────────────────────────────────────────────────────────

/// The id-keyed document tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
  Messages,
  Certificates,
  Partners,
}

impl Collection {
  pub fn table(self) -> &'static str {
    match self {
      Collection::Messages => "messages",
      Collection::Certificates => "certificates",
      Collection::Partners => "partners",
    }
  }
}

// ─── Document ────────────────────────────────────────────────────────────────

/// A JSON object plus the envelope fields promoted to columns.
///
/// `body` always contains `id` and `timestamp` mirroring the struct fields,
/// so a document read back from storage is self-describing.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
  pub id:        String,
  pub timestamp: String,
  pub body:      Map<String, Value>,
}

impl Document {
  /// Wrap a client payload, assigning `id` and `timestamp` when absent.
  pub fn from_payload(payload: Value, now: DateTime<Utc>) -> Result<Self> {
    let Value::Object(mut body) = payload else {
      return Err(Error::NotAnObject);
    };

    let id = match body.get("id") {
      Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_owned(),
      Some(Value::Number(n)) => n.to_string(),
      _ => generate_id(now),
    };
    let timestamp = match body.get("timestamp") {
      Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
      _ => encode_timestamp(now),
    };

    body.insert("id".to_owned(), Value::String(id.clone()));
    body.insert("timestamp".to_owned(), Value::String(timestamp.clone()));

    Ok(Self { id, timestamp, body })
  }

  /// Rebuild a document from its stored JSON text.
  pub fn from_stored(data: &str) -> Result<Self> {
    let value: Value = serde_json::from_str(data)?;
    let Value::Object(body) = value else {
      return Err(Error::NotAnObject);
    };
    let field = |name: &str| {
      body
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default()
    };
    Ok(Self { id: field("id"), timestamp: field("timestamp"), body })
  }

  /// The certificate category, defaulting to [`DEFAULT_CERTIFICATE_TYPE`].
  pub fn certificate_type(&self) -> &str {
    self
      .body
      .get("type")
      .and_then(Value::as_str)
      .filter(|t| !t.trim().is_empty())
      .unwrap_or(DEFAULT_CERTIFICATE_TYPE)
  }

  pub fn to_json_string(&self) -> Result<String> {
    Ok(serde_json::to_string(&self.body)?)
  }

  pub fn into_value(self) -> Value { Value::Object(self.body) }
}

// ─── Ids and timestamps ──────────────────────────────────────────────────────

/// Generate a document id: microsecond timestamp followed by six random hex
/// digits, so concurrent writers within the same microsecond do not collide.
pub fn generate_id(now: DateTime<Utc>) -> String {
  let random = Uuid::new_v4().simple().to_string();
  let suffix = random.get(..6).unwrap_or(&random);
  format!("{}{suffix}", now.format("%Y%m%d%H%M%S%6f"))
}

/// RFC 3339 with microseconds; sorts lexicographically in time order.
pub fn encode_timestamp(now: DateTime<Utc>) -> String {
  now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn assigns_id_and_timestamp_when_missing() {
    let now = Utc::now();
    let doc = Document::from_payload(json!({"name": "Ana", "text": "Hello"}), now)
      .unwrap();

    assert!(doc.id.starts_with(&now.format("%Y%m%d").to_string()));
    assert_eq!(doc.id.len(), 20 + 6);
    assert_eq!(doc.body["id"], json!(doc.id));
    assert_eq!(doc.body["timestamp"], json!(doc.timestamp));
    assert_eq!(doc.body["name"], json!("Ana"));
  }

  #[test]
  fn keeps_client_supplied_id_and_timestamp() {
    let doc = Document::from_payload(
      json!({"id": "abc", "timestamp": "2024-01-01T00:00:00Z"}),
      Utc::now(),
    )
    .unwrap();
    assert_eq!(doc.id, "abc");
    assert_eq!(doc.timestamp, "2024-01-01T00:00:00Z");
  }

  #[test]
  fn numeric_ids_are_stringified() {
    let doc = Document::from_payload(json!({"id": 42}), Utc::now()).unwrap();
    assert_eq!(doc.id, "42");
    assert_eq!(doc.body["id"], json!("42"));
  }

  #[test]
  fn rejects_non_objects() {
    let err = Document::from_payload(json!([1, 2]), Utc::now()).unwrap_err();
    assert!(matches!(err, Error::NotAnObject));
  }

  #[test]
  fn generated_ids_differ_within_the_same_instant() {
    let now = Utc::now();
    assert_ne!(generate_id(now), generate_id(now));
  }

  #[test]
  fn certificate_type_defaults() {
    let now = Utc::now();
    let plain = Document::from_payload(json!({}), now).unwrap();
    assert_eq!(plain.certificate_type(), DEFAULT_CERTIFICATE_TYPE);

    let typed = Document::from_payload(json!({"type": "autorizatie"}), now).unwrap();
    assert_eq!(typed.certificate_type(), "autorizatie");
  }

  #[test]
  fn stored_round_trip_keeps_envelope() {
    let doc = Document::from_payload(json!({"title": "ISO"}), Utc::now()).unwrap();
    let back = Document::from_stored(&doc.to_json_string().unwrap()).unwrap();
    assert_eq!(back, doc);
  }
}
