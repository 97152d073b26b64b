//! Singleton configuration rows (`id = 1`).

use serde_json::{Value, json};

use crate::{Error, Result};

/// Videos shown before an administrator configures the list.
pub const DEFAULT_TIKTOK_VIDEOS: [&str; 3] =
  ["7567003645250702614", "7564125179761167638", "7556587113244937475"];

/// JSON-valued singleton tables. The admin password hash is kept apart
/// because it is not a JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Singleton {
  SiteTexts,
  TiktokVideos,
  Locations,
}

impl Singleton {
  pub fn table(self) -> &'static str {
    match self {
      Singleton::SiteTexts => "site_texts",
      Singleton::TiktokVideos => "tiktok_videos",
      Singleton::Locations => "locations",
    }
  }

  /// Value served when the row has never been written.
  pub fn default_value(self) -> Value {
    match self {
      Singleton::SiteTexts => json!({}),
      Singleton::TiktokVideos => json!(DEFAULT_TIKTOK_VIDEOS),
      Singleton::Locations => json!([]),
    }
  }

  /// Check the payload shape: site texts are an object, the rest are arrays.
  pub fn validate(self, value: &Value) -> Result<()> {
    let ok = match self {
      Singleton::SiteTexts => value.is_object(),
      Singleton::TiktokVideos | Singleton::Locations => value.is_array(),
    };
    if ok {
      Ok(())
    } else {
      Err(Error::InvalidField {
        field:  self.table(),
        reason: if value.is_array() {
          "expected an object".to_owned()
        } else {
          "expected an array".to_owned()
        },
      })
    }
  }
}
