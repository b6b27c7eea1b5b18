//! Term ranking index — frequency counters over `(term, search_type)` pairs.
//!
//! Every observation increments two counters: the `(term, search_type)` pair
//! counter and a cross-category aggregate for the term, kept in the `general`
//! field of the same key. The two increments are separate optimistic
//! transactions, not a pair — a crash between them leaves the aggregate one
//! behind, an accepted weak-consistency tradeoff.
//!
//! Each single increment is read-modify-write safe: a compare-and-set that
//! lost its race is retried up to [`MAX_INCREMENT_RETRIES`] times and then
//! surfaced as [`Error::Conflict`], never silently dropped.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
  error::{Error, Result},
  store::KvStore,
};

/// Field name of the cross-category aggregate counter.
pub const GENERAL: &str = "general";

/// Bound on optimistic-concurrency retries per increment.
pub const MAX_INCREMENT_RETRIES: u32 = 8;

// ─── Records ─────────────────────────────────────────────────────────────────

/// A frequency counter for a term within one category.
///
/// `count` is monotonically non-decreasing: created at 1 on first observation,
/// incremented by exactly 1 per observation, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
  pub term:        String,
  pub search_type: String,
  pub count:       u64,
}

/// A raw search-phrase event, logged fire-and-forget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseEvent {
  pub phrase:      String,
  pub customer_id: String,
  pub source_id:   String,
  pub timestamp:   String,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct TermRankingIndex<S> {
  store: Arc<S>,
}

impl<S> Clone for TermRankingIndex<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store) }
  }
}

impl<S: KvStore> TermRankingIndex<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store }
  }

  /// Record one observation of `(term, search_type)`: bumps the pair counter
  /// and the term's `general` aggregate.
  pub async fn save(&self, term: &str, search_type: &str) -> Result<()> {
    self.increment(term, search_type, search_type).await?;
    self.increment(term, GENERAL, GENERAL).await
  }

  /// Log a raw search phrase under `"phrase:{phrase}"`. Overwrites any prior
  /// event for the same phrase.
  pub async fn log_phrase(&self, event: &PhraseEvent) -> Result<()> {
    let key = format!("phrase:{}", event.phrase);
    let value = serde_json::to_string(event)?;
    self
      .store
      .set_field(&key, "term", &value)
      .await
      .map_err(Error::store)
  }

  /// The `limit` most frequent counters whose term contains `query` and whose
  /// category is exactly `search_type`, count-descending.
  pub async fn top_terms(
    &self,
    query: &str,
    search_type: &str,
    limit: usize,
  ) -> Result<Vec<TermCount>> {
    self.top(query, search_type, limit).await
  }

  /// The `limit` most frequent cross-category aggregates whose term contains
  /// `query`, count-descending.
  pub async fn top_general_terms(
    &self,
    query: &str,
    limit: usize,
  ) -> Result<Vec<TermCount>> {
    self.top(query, GENERAL, limit).await
  }

  /// One optimistic read-modify-write increment of `field` under `key`.
  async fn increment(&self, key: &str, field: &str, search_type: &str) -> Result<()> {
    for _ in 0..MAX_INCREMENT_RETRIES {
      let current = self
        .store
        .get_field(key, field)
        .await
        .map_err(Error::store)?;

      let count = match &current {
        None => 1,
        Some(raw) => serde_json::from_str::<TermCount>(raw)?.count + 1,
      };
      let next = TermCount {
        term:        key.to_owned(),
        search_type: search_type.to_owned(),
        count,
      };
      let value = serde_json::to_string(&next)?;

      let committed = self
        .store
        .set_field_checked(key, field, current.as_deref(), &value)
        .await
        .map_err(Error::store)?;
      if committed {
        return Ok(());
      }
    }
    Err(Error::Conflict(MAX_INCREMENT_RETRIES))
  }

  async fn top(
    &self,
    query: &str,
    field: &str,
    limit: usize,
  ) -> Result<Vec<TermCount>> {
    let pattern = format!("*{query}*");
    let mut keys = self.store.scan_keys(&pattern).await.map_err(Error::store)?;
    // Scan order is backend-dependent; sort so ties break deterministically.
    // A cursor scan may also hand back the same key more than once.
    keys.sort();
    keys.dedup();

    let mut counts = Vec::new();
    for key in keys {
      let Some(raw) = self
        .store
        .get_field(&key, field)
        .await
        .map_err(Error::store)?
      else {
        // Key matched the pattern but holds no counter for this category
        // (a presence record, a phrase event, or another category's term).
        continue;
      };
      match serde_json::from_str::<TermCount>(&raw) {
        Ok(count) => counts.push(count),
        // Non-counter data sharing the key space is skipped, not fatal.
        Err(_) => continue,
      }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    Ok(counts)
  }
}
