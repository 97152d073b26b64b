//! Chatbot transcript entries and keyword responses.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{Error, Result, document::encode_timestamp};

/// One logged chatbot line (`{type, message}`), keyed by an auto-increment id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatEntry {
  pub id:        i64,
  pub timestamp: String,
  #[serde(flatten)]
  pub data:      Map<String, Value>,
}

/// A transcript line ready to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChatEntry {
  pub timestamp: String,
  pub data:      Map<String, Value>,
}

impl NewChatEntry {
  /// Validate a client payload. `message` is required; `type` defaults to
  /// `"user"`. Envelope fields are stripped from the stored blob.
  pub fn from_payload(payload: Value, now: DateTime<Utc>) -> Result<Self> {
    let Value::Object(mut data) = payload else {
      return Err(Error::NotAnObject);
    };

    match data.get("message") {
      Some(Value::String(m)) if !m.trim().is_empty() => {}
      _ => return Err(Error::MissingField("message")),
    }
    if !matches!(data.get("type"), Some(Value::String(_))) {
      data.insert("type".to_owned(), Value::String("user".to_owned()));
    }

    data.remove("id");
    let timestamp = match data.remove("timestamp") {
      Some(Value::String(ts)) if !ts.trim().is_empty() => ts,
      _ => encode_timestamp(now),
    };

    Ok(Self { timestamp, data })
  }
}

/// A keyword → canned answer pair used by the site chatbot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatbotResponse {
  pub keyword:  String,
  pub response: String,
}

impl ChatbotResponse {
  /// Keywords are matched case-insensitively by the widget, so they are
  /// stored trimmed and lowercased.
  pub fn new(keyword: &str, response: &str) -> Result<Self> {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
      return Err(Error::MissingField("keyword"));
    }
    if response.trim().is_empty() {
      return Err(Error::MissingField("response"));
    }
    Ok(Self { keyword, response: response.to_owned() })
  }
}
