//! [`SqlStore`]: the [`SiteStore`] implementation over [`Storage`].
//!
//! Every operation acquires a connection, runs dialect-neutral SQL, and
//! releases it. Which backend served the call is invisible from here.

use std::{collections::BTreeMap, path::Path, sync::Arc};

use chrono::Utc;
use serde_json::{Map, Value as Json};

use sofimar_core::{
  BackendKind,
  backend::Health,
  chat::{ChatEntry, ChatbotResponse, NewChatEntry},
  document::{Collection, Document, encode_timestamp},
  review::Review,
  singleton::Singleton,
  store::{SiteStore, Stats},
};

use crate::{
  Connection, Error, Result, Storage, StorageConfig,
  value::{Row, Value},
};

const REVIEW_COLUMNS: [&str; 7] =
  ["id", "name", "rating", "comment", "date", "approved", "timestamp"];

// ─── Store ───────────────────────────────────────────────────────────────────

/// Cloning is cheap; clones share one [`Storage`].
#[derive(Clone)]
pub struct SqlStore {
  storage: Arc<Storage>,
}

impl SqlStore {
  pub fn new(storage: Storage) -> Self { Self { storage: Arc::new(storage) } }

  pub fn from_shared(storage: Arc<Storage>) -> Self { Self { storage } }

  /// A store that always uses the SQLite file at `path`, ignoring database
  /// URL variables.
  pub fn embedded(path: impl AsRef<Path>) -> Self {
    Self::new(Storage::with_lookup(StorageConfig::new(path.as_ref()), |_| None))
  }

  pub fn storage(&self) -> &Storage { &self.storage }

  async fn finish<T>(&self, conn: Connection, result: Result<T>) -> Result<T> {
    self.storage.release(conn).await;
    result
  }
}

// ─── Row decoding ────────────────────────────────────────────────────────────

fn parse_object(data: &str, column: &str) -> Result<Map<String, Json>> {
  match serde_json::from_str(data)? {
    Json::Object(map) => Ok(map),
    other => Err(Error::Column {
      column: column.to_owned(),
      reason: format!("expected a JSON object, found {other}"),
    }),
  }
}

fn decode_review(row: &Row) -> Result<Review> {
  let rating = row.int("rating")?;
  Ok(Review {
    id:        row.text("id")?,
    author:    row.text("name")?,
    rating:    u8::try_from(rating).map_err(|_| Error::Column {
      column: "rating".to_owned(),
      reason: format!("{rating} out of range"),
    })?,
    comment:   row.opt_text("comment")?.unwrap_or_default(),
    date:      row.opt_text("date")?.unwrap_or_default(),
    approved:  row.bool("approved")?,
    timestamp: row.text("timestamp")?,
  })
}

async fn count(conn: &Connection, sql: &str, params: Vec<Value>) -> Result<i64> {
  match conn.fetch_optional(sql, params).await? {
    Some(row) => row.int("n"),
    None => Ok(0),
  }
}

// ─── SiteStore impl ──────────────────────────────────────────────────────────

impl SiteStore for SqlStore {
  type Error = Error;

  // ── Diagnostics ───────────────────────────────────────────────────────────

  fn backend(&self) -> BackendKind { self.storage.selection().kind }

  async fn health(&self) -> Health { self.storage.health().await }

  async fn stats(&self) -> Result<Stats> {
    let conn = self.storage.acquire().await?;
    let result: Result<Stats> = async {
      let table = |t: &str| format!("SELECT COUNT(*) AS n FROM {t}");
      Ok(Stats {
        messages:          count(&conn, &table("messages"), vec![]).await?,
        certificates:      count(&conn, &table("certificates"), vec![]).await?,
        partners:          count(&conn, &table("partners"), vec![]).await?,
        reviews:           count(&conn, &table("reviews"), vec![]).await?,
        pending_reviews:   count(
          &conn,
          "SELECT COUNT(*) AS n FROM reviews WHERE approved = ?",
          vec![false.into()],
        )
        .await?,
        chat_entries:      count(&conn, &table("chatbot_messages"), vec![]).await?,
        chatbot_responses: count(&conn, &table("chatbot_responses"), vec![]).await?,
        visits_total:      count(
          &conn,
          "SELECT COALESCE(SUM(count), 0) AS n FROM visits",
          vec![],
        )
        .await?,
        visit_days:        count(&conn, &table("visits"), vec![]).await?,
      })
    }
    .await;
    self.finish(conn, result).await
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn list_documents(&self, collection: Collection) -> Result<Vec<Document>> {
    let conn = self.storage.acquire().await?;
    let result: Result<Vec<Document>> = async {
      let sql = match collection {
        Collection::Certificates => {
          "SELECT data, type FROM certificates ORDER BY timestamp DESC".to_owned()
        }
        other => format!("SELECT data FROM {} ORDER BY timestamp DESC", other.table()),
      };

      let mut documents = Vec::new();
      for row in conn.fetch(&sql, vec![]).await? {
        let mut doc = Document::from_stored(&row.text("data")?)?;
        if collection == Collection::Certificates {
          if let Some(kind) = row.opt_text("type")? {
            doc.body.insert("type".to_owned(), Json::String(kind));
          }
        }
        documents.push(doc);
      }
      Ok(documents)
    }
    .await;
    self.finish(conn, result).await
  }

  async fn save_document(&self, collection: Collection, document: Document) -> Result<()> {
    let data = document.to_json_string()?;
    let conn = self.storage.acquire().await?;
    let result: Result<()> = async {
      match collection {
        Collection::Messages => {
          conn
            .commit(
              "INSERT INTO messages (id, data, timestamp) VALUES (?, ?, ?)",
              vec![document.id.clone().into(), data.into(), document.timestamp.clone().into()],
            )
            .await?;
        }
        Collection::Certificates => {
          conn
            .insert_or_replace(
              "certificates",
              "id",
              &["id", "data", "type", "timestamp"],
              vec![
                document.id.clone().into(),
                data.into(),
                document.certificate_type().into(),
                document.timestamp.clone().into(),
              ],
            )
            .await?;
        }
        Collection::Partners => {
          conn
            .insert_or_replace(
              "partners",
              "id",
              &["id", "data", "timestamp"],
              vec![document.id.clone().into(), data.into(), document.timestamp.clone().into()],
            )
            .await?;
        }
      }
      Ok(())
    }
    .await;
    self.finish(conn, result).await
  }

  async fn delete_document(&self, collection: Collection, id: String) -> Result<bool> {
    let conn = self.storage.acquire().await?;
    let sql = format!("DELETE FROM {} WHERE id = ?", collection.table());
    let result = conn.commit(&sql, vec![id.into()]).await.map(|n| n > 0);
    self.finish(conn, result).await
  }

  async fn clear_documents(&self, collection: Collection) -> Result<u64> {
    let conn = self.storage.acquire().await?;
    let sql = format!("DELETE FROM {}", collection.table());
    let result = conn.commit(&sql, vec![]).await;
    self.finish(conn, result).await
  }

  // ── Singletons ────────────────────────────────────────────────────────────

  async fn get_singleton(&self, singleton: Singleton) -> Result<Option<Json>> {
    let conn = self.storage.acquire().await?;
    let sql = format!("SELECT data FROM {} WHERE id = 1", singleton.table());
    let result: Result<Option<Json>> = async {
      match conn.fetch_optional(&sql, vec![]).await? {
        Some(row) => Ok(Some(serde_json::from_str(&row.text("data")?)?)),
        None => Ok(None),
      }
    }
    .await;
    self.finish(conn, result).await
  }

  async fn put_singleton(&self, singleton: Singleton, value: Json) -> Result<()> {
    singleton.validate(&value)?;
    let data = serde_json::to_string(&value)?;
    let conn = self.storage.acquire().await?;
    let result = conn
      .insert_or_replace(
        singleton.table(),
        "id",
        &["id", "data", "last_updated"],
        vec![1i64.into(), data.into(), encode_timestamp(Utc::now()).into()],
      )
      .await
      .map(|_| ());
    self.finish(conn, result).await
  }

  async fn admin_password_hash(&self) -> Result<Option<String>> {
    let conn = self.storage.acquire().await?;
    let result: Result<Option<String>> = async {
      match conn
        .fetch_optional("SELECT password FROM admin_password WHERE id = 1", vec![])
        .await?
      {
        Some(row) => row.opt_text("password"),
        None => Ok(None),
      }
    }
    .await;
    self.finish(conn, result).await
  }

  async fn set_admin_password_hash(&self, hash: String) -> Result<()> {
    let conn = self.storage.acquire().await?;
    let result = conn
      .insert_or_replace(
        "admin_password",
        "id",
        &["id", "password", "last_updated"],
        vec![1i64.into(), hash.into(), encode_timestamp(Utc::now()).into()],
      )
      .await
      .map(|_| ());
    self.finish(conn, result).await
  }

  // ── Reviews ───────────────────────────────────────────────────────────────

  async fn list_reviews(&self, approved_only: bool) -> Result<Vec<Review>> {
    let conn = self.storage.acquire().await?;
    let result: Result<Vec<Review>> = async {
      let columns = REVIEW_COLUMNS.join(", ");
      let rows = if approved_only {
        conn
          .fetch(
            &format!("SELECT {columns} FROM reviews WHERE approved = ? ORDER BY timestamp DESC"),
            vec![true.into()],
          )
          .await?
      } else {
        conn
          .fetch(&format!("SELECT {columns} FROM reviews ORDER BY timestamp DESC"), vec![])
          .await?
      };
      rows.iter().map(decode_review).collect()
    }
    .await;
    self.finish(conn, result).await
  }

  async fn get_review(&self, id: String) -> Result<Option<Review>> {
    let conn = self.storage.acquire().await?;
    let result: Result<Option<Review>> = async {
      let columns = REVIEW_COLUMNS.join(", ");
      let rows = conn
        .fetch(&format!("SELECT {columns} FROM reviews WHERE id = ?"), vec![id.into()])
        .await?;
      rows.first().map(decode_review).transpose()
    }
    .await;
    self.finish(conn, result).await
  }

  async fn save_review(&self, review: Review) -> Result<()> {
    review.validate()?;
    let conn = self.storage.acquire().await?;
    let result = conn
      .insert_or_replace(
        "reviews",
        "id",
        &REVIEW_COLUMNS,
        vec![
          review.id.into(),
          review.author.into(),
          review.rating.into(),
          review.comment.into(),
          review.date.into(),
          review.approved.into(),
          review.timestamp.into(),
        ],
      )
      .await
      .map(|_| ());
    self.finish(conn, result).await
  }

  async fn delete_review(&self, id: String) -> Result<bool> {
    let conn = self.storage.acquire().await?;
    let result = conn
      .commit("DELETE FROM reviews WHERE id = ?", vec![id.into()])
      .await
      .map(|n| n > 0);
    self.finish(conn, result).await
  }

  // ── Chatbot ───────────────────────────────────────────────────────────────

  async fn list_chat_entries(&self) -> Result<Vec<ChatEntry>> {
    let conn = self.storage.acquire().await?;
    let result: Result<Vec<ChatEntry>> = async {
      conn
        .fetch(
          "SELECT id, data, timestamp FROM chatbot_messages ORDER BY timestamp ASC, id ASC",
          vec![],
        )
        .await?
        .iter()
        .map(|row| {
          Ok(ChatEntry {
            id:        row.int("id")?,
            timestamp: row.text("timestamp")?,
            data:      parse_object(&row.text("data")?, "data")?,
          })
        })
        .collect()
    }
    .await;
    self.finish(conn, result).await
  }

  async fn append_chat_entry(&self, entry: NewChatEntry) -> Result<i64> {
    let data = serde_json::to_string(&entry.data)?;
    let conn = self.storage.acquire().await?;
    let result: Result<i64> = async {
      let row = conn
        .fetch_optional(
          "INSERT INTO chatbot_messages (data, timestamp) VALUES (?, ?) RETURNING id",
          vec![data.into(), entry.timestamp.into()],
        )
        .await?
        .ok_or_else(|| Error::Query("insert returned no id".to_owned()))?;
      row.int("id")
    }
    .await;
    self.finish(conn, result).await
  }

  async fn delete_chat_entry(&self, id: i64) -> Result<bool> {
    // PostgreSQL keys the transcript with a 32-bit SERIAL; no row can carry a
    // larger id on either backend.
    if i32::try_from(id).is_err() {
      return Ok(false);
    }
    let conn = self.storage.acquire().await?;
    let result = conn
      .commit("DELETE FROM chatbot_messages WHERE id = ?", vec![id.into()])
      .await
      .map(|n| n > 0);
    self.finish(conn, result).await
  }

  async fn clear_chat_entries(&self) -> Result<u64> {
    let conn = self.storage.acquire().await?;
    let result = conn.commit("DELETE FROM chatbot_messages", vec![]).await;
    self.finish(conn, result).await
  }

  async fn list_chatbot_responses(&self) -> Result<Vec<ChatbotResponse>> {
    let conn = self.storage.acquire().await?;
    let result: Result<Vec<ChatbotResponse>> = async {
      conn
        .fetch("SELECT keyword, response FROM chatbot_responses ORDER BY keyword", vec![])
        .await?
        .iter()
        .map(|row| {
          Ok(ChatbotResponse { keyword: row.text("keyword")?, response: row.text("response")? })
        })
        .collect()
    }
    .await;
    self.finish(conn, result).await
  }

  async fn save_chatbot_response(&self, response: ChatbotResponse) -> Result<()> {
    let conn = self.storage.acquire().await?;
    let result = conn
      .insert_or_replace(
        "chatbot_responses",
        "keyword",
        &["keyword", "response", "timestamp"],
        vec![
          response.keyword.into(),
          response.response.into(),
          encode_timestamp(Utc::now()).into(),
        ],
      )
      .await
      .map(|_| ());
    self.finish(conn, result).await
  }

  async fn delete_chatbot_response(&self, keyword: String) -> Result<bool> {
    let keyword = keyword.trim().to_lowercase();
    let conn = self.storage.acquire().await?;
    let result = conn
      .commit("DELETE FROM chatbot_responses WHERE keyword = ?", vec![keyword.into()])
      .await
      .map(|n| n > 0);
    self.finish(conn, result).await
  }

  async fn clear_chatbot_responses(&self) -> Result<u64> {
    let conn = self.storage.acquire().await?;
    let result = conn.commit("DELETE FROM chatbot_responses", vec![]).await;
    self.finish(conn, result).await
  }

  // ── Visits ────────────────────────────────────────────────────────────────

  async fn record_visit(&self, date: String) -> Result<i64> {
    let conn = self.storage.acquire().await?;
    let result = conn.increment("visits", "date", "count", date.into()).await;
    self.finish(conn, result).await
  }

  async fn list_visits(&self) -> Result<BTreeMap<String, i64>> {
    let conn = self.storage.acquire().await?;
    let result: Result<BTreeMap<String, i64>> = async {
      conn
        .fetch("SELECT date, count FROM visits ORDER BY date", vec![])
        .await?
        .iter()
        .map(|row| Ok((row.text("date")?, row.int("count")?)))
        .collect()
    }
    .await;
    self.finish(conn, result).await
  }

  async fn clear_visits(&self) -> Result<u64> {
    let conn = self.storage.acquire().await?;
    let result = conn.commit("DELETE FROM visits", vec![]).await;
    self.finish(conn, result).await
  }
}
