//! The `SiteStore` trait and supporting report types.
//!
//! The trait is implemented by storage backends (e.g. `sofimar-store`).
//! The HTTP layer depends on this abstraction, not on any concrete backend,
//! and never learns which SQL dialect is active.

use std::{collections::BTreeMap, future::Future};

use serde::Serialize;
use serde_json::Value;

use crate::{
  StoreError,
  backend::{BackendKind, Health},
  chat::{ChatEntry, ChatbotResponse, NewChatEntry},
  document::{Collection, Document},
  review::Review,
  singleton::Singleton,
};

/// Row counts shown on the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
  pub messages:          i64,
  pub certificates:      i64,
  pub partners:          i64,
  pub reviews:           i64,
  pub pending_reviews:   i64,
  pub chat_entries:      i64,
  pub chatbot_responses: i64,
  pub visits_total:      i64,
  pub visit_days:        i64,
}

/// Abstraction over the site's persistent state.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SiteStore: Send + Sync {
  type Error: StoreError;

  // ── Diagnostics ───────────────────────────────────────────────────────

  /// The configured backend. Does not touch the database.
  fn backend(&self) -> BackendKind;

  /// Acquire a connection and run a trivial query.
  fn health(&self) -> impl Future<Output = Health> + Send + '_;

  fn stats(&self) -> impl Future<Output = Result<Stats, Self::Error>> + Send + '_;

  // ── Documents ─────────────────────────────────────────────────────────

  /// All documents of a collection, newest first.
  fn list_documents(
    &self,
    collection: Collection,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + '_;

  /// Persist a document. Collections that replace by id upsert; the others
  /// reject a reused id with a constraint violation.
  fn save_document(
    &self,
    collection: Collection,
    document: Document,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Returns `false` if no document had that id.
  fn delete_document(
    &self,
    collection: Collection,
    id: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete every document of a collection; returns the number removed.
  fn clear_documents(
    &self,
    collection: Collection,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Singletons ────────────────────────────────────────────────────────

  fn get_singleton(
    &self,
    singleton: Singleton,
  ) -> impl Future<Output = Result<Option<Value>, Self::Error>> + Send + '_;

  /// Replace the singleton row; last writer wins.
  fn put_singleton(
    &self,
    singleton: Singleton,
    value: Value,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn admin_password_hash(
    &self,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  fn set_admin_password_hash(
    &self,
    hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reviews ───────────────────────────────────────────────────────────

  fn list_reviews(
    &self,
    approved_only: bool,
  ) -> impl Future<Output = Result<Vec<Review>, Self::Error>> + Send + '_;

  fn get_review(
    &self,
    id: String,
  ) -> impl Future<Output = Result<Option<Review>, Self::Error>> + Send + '_;

  /// Insert or replace a review by id. Out-of-range ratings are rejected
  /// before any SQL is issued.
  fn save_review(
    &self,
    review: Review,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_review(
    &self,
    id: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Chatbot ───────────────────────────────────────────────────────────

  /// Transcript in chronological order.
  fn list_chat_entries(
    &self,
  ) -> impl Future<Output = Result<Vec<ChatEntry>, Self::Error>> + Send + '_;

  /// Append a transcript line and return its generated id.
  fn append_chat_entry(
    &self,
    entry: NewChatEntry,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  fn delete_chat_entry(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn clear_chat_entries(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Keyword responses ordered by keyword.
  fn list_chatbot_responses(
    &self,
  ) -> impl Future<Output = Result<Vec<ChatbotResponse>, Self::Error>> + Send + '_;

  fn save_chatbot_response(
    &self,
    response: ChatbotResponse,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_chatbot_response(
    &self,
    keyword: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn clear_chatbot_responses(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Visits ────────────────────────────────────────────────────────────

  /// Increment the counter for `date` and return the new count.
  fn record_visit(
    &self,
    date: String,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  fn list_visits(
    &self,
  ) -> impl Future<Output = Result<BTreeMap<String, i64>, Self::Error>> + Send + '_;

  fn clear_visits(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
