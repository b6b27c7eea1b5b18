//! Autocomplete index — frequency-ranked raw term strings.
//!
//! Terms live in named ranked-set buckets (one per search type, plus a
//! cross-cutting `general` bucket) and are normalised to trimmed lowercase
//! before any read or write. Matching is substring, not strictly prefix.

use std::{collections::HashSet, sync::Arc};

use crate::{
  error::{Error, Result},
  ranking::GENERAL,
  store::KvStore,
};

/// Default number of suggestions returned.
pub const SUGGESTION_LIMIT: usize = 7;

pub struct AutocompleteIndex<S> {
  store: Arc<S>,
}

impl<S> Clone for AutocompleteIndex<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store) }
  }
}

impl<S: KvStore> AutocompleteIndex<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store }
  }

  /// Record one observed use of `term`: +1 in the `search_type` bucket and
  /// +1 in the `general` bucket.
  pub async fn record(&self, term: &str, search_type: &str) -> Result<()> {
    let term = normalize(term);
    let bucket = normalize(search_type);
    self
      .store
      .ranked_incr(&bucket, &term, 1.0)
      .await
      .map_err(Error::store)?;
    self
      .store
      .ranked_incr(GENERAL, &term, 1.0)
      .await
      .map_err(Error::store)?;
    Ok(())
  }

  /// Up to `limit` terms of the `search_type` bucket containing `query`,
  /// deduplicated, highest score first. Ties keep the bucket's enumeration
  /// order, which is stable per run but otherwise unspecified.
  ///
  /// A bucket that does not exist yields an empty list, not an error.
  pub async fn suggest(
    &self,
    query: &str,
    search_type: &str,
    limit: usize,
  ) -> Result<Vec<String>> {
    let query = normalize(query);
    let bucket = normalize(search_type);
    let pattern = format!("*{query}*");

    let mut scored = self
      .store
      .ranked_scan(&bucket, &pattern)
      .await
      .map_err(Error::store)?;
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    // A cursor scan may hand back the same member more than once.
    let mut seen = HashSet::new();
    let mut terms: Vec<String> = scored
      .into_iter()
      .filter(|(member, _)| seen.insert(member.clone()))
      .map(|(member, _)| member)
      .collect();
    terms.truncate(limit);
    Ok(terms)
  }
}

fn normalize(s: &str) -> String {
  s.trim().to_lowercase()
}
