//! Presence store — the latest known position of each tracked resource.
//!
//! One live record per `(resource_type, id)` identity; an upsert replaces the
//! prior record wholesale, never merging fields. Two concurrent upserts to the
//! same identity race last-write-wins, which is all the backing store's
//! per-key atomicity promises.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
  error::{Error, Result},
  store::KvStore,
};

// ─── Record ──────────────────────────────────────────────────────────────────

/// The latest known position and metadata for one tracked resource.
///
/// `latitude`, `longitude`, and `timestamp` are caller-supplied strings
/// preserved verbatim — they are never renormalised on write. Coordinates are
/// only parsed when a proximity query needs to measure against them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
  pub resource_type: String,
  pub id:            String,
  pub session_id:    Option<String>,
  pub latitude:      String,
  pub longitude:     String,
  pub timestamp:     String,
}

impl PresenceRecord {
  /// Storage key: `"{resource_type}:{id}"`.
  pub fn key(&self) -> String {
    presence_key(&self.resource_type, &self.id)
  }
}

pub(crate) fn presence_key(resource_type: &str, id: &str) -> String {
  format!("{resource_type}:{id}")
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Upsert and point-lookup over presence records.
pub struct PresenceStore<S> {
  store: Arc<S>,
}

impl<S> Clone for PresenceStore<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store) }
  }
}

impl<S: KvStore> PresenceStore<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store }
  }

  /// Set semantics: always succeeds, replacing any existing record.
  pub async fn upsert(&self, record: &PresenceRecord) -> Result<()> {
    let value = serde_json::to_string(record)?;
    self
      .store
      .set_field(&record.key(), &record.resource_type, &value)
      .await
      .map_err(Error::store)
  }

  /// Update semantics: fails with [`Error::NotFound`] if no record exists for
  /// the identity, otherwise behaves as [`upsert`](Self::upsert).
  pub async fn update(&self, record: &PresenceRecord) -> Result<()> {
    let existing = self
      .store
      .get_field(&record.key(), &record.resource_type)
      .await
      .map_err(Error::store)?;
    if existing.is_none() {
      return Err(Error::NotFound);
    }
    self.upsert(record).await
  }

  pub async fn get(&self, resource_type: &str, id: &str) -> Result<PresenceRecord> {
    let key = presence_key(resource_type, id);
    let value = self
      .store
      .get_field(&key, resource_type)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound)?;
    Ok(serde_json::from_str(&value)?)
  }
}
