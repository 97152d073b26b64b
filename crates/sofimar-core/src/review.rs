//! Customer reviews, the one entity with validated relational columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  Error, Result,
  document::{encode_timestamp, generate_id},
};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// A stored review as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
  pub id:        String,
  pub author:    String,
  pub rating:    u8,
  pub comment:   String,
  pub date:      String,
  pub approved:  bool,
  #[serde(skip)]
  pub timestamp: String,
}

impl Review {
  /// Reject ratings outside `1..=5`.
  pub fn validate(&self) -> Result<()> {
    check_rating(i64::from(self.rating)).map(|_| ())
  }
}

/// Review payload as submitted by the public form or the admin panel.
///
/// Both `author`/`name` and `comment`/`text` spellings are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewInput {
  pub id:       Option<String>,
  #[serde(alias = "name")]
  pub author:   Option<String>,
  pub rating:   Option<Value>,
  #[serde(alias = "text")]
  pub comment:  Option<String>,
  pub date:     Option<String>,
  pub approved: Option<bool>,
}

impl ReviewInput {
  /// Validate the input and build a [`Review`].
  ///
  /// `approved` falls back to `default_approved` when the payload omits it.
  pub fn into_review(self, default_approved: bool, now: DateTime<Utc>) -> Result<Review> {
    let author = non_empty(self.author).ok_or(Error::MissingField("author"))?;
    let comment = non_empty(self.comment).ok_or(Error::MissingField("comment"))?;
    let rating = parse_rating(self.rating.as_ref())?;

    Ok(Review {
      id: non_empty(self.id).unwrap_or_else(|| generate_id(now)),
      author,
      rating,
      comment,
      date: non_empty(self.date).unwrap_or_else(|| now.format("%Y-%m-%d").to_string()),
      approved: self.approved.unwrap_or(default_approved),
      timestamp: encode_timestamp(now),
    })
  }
}

fn non_empty(s: Option<String>) -> Option<String> {
  s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

fn parse_rating(raw: Option<&Value>) -> Result<u8> {
  let value = match raw {
    None | Some(Value::Null) => return Err(Error::MissingField("rating")),
    Some(Value::Number(n)) => n.as_i64().ok_or_else(|| Error::InvalidField {
      field:  "rating",
      reason: format!("{n} is not an integer"),
    })?,
    Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| Error::InvalidField {
      field:  "rating",
      reason: format!("{s:?} is not an integer"),
    })?,
    Some(other) => {
      return Err(Error::InvalidField {
        field:  "rating",
        reason: format!("unexpected value {other}"),
      });
    }
  };
  check_rating(value)
}

fn check_rating(value: i64) -> Result<u8> {
  if !(MIN_RATING..=MAX_RATING).contains(&value) {
    return Err(Error::InvalidRating(value));
  }
  u8::try_from(value).map_err(|_| Error::InvalidRating(value))
}
