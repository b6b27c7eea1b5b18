//! [`MemoryStore`] — an in-process [`KvStore`] used by the test suites.
//!
//! Backed by `BTreeMap`s so scans enumerate deterministically, which the
//! ranking engines rely on for stable tie ordering. Cloning is cheap; all
//! clones share the same data.

use std::{
  collections::BTreeMap,
  convert::Infallible,
  sync::{Arc, Mutex},
};

use crate::store::KvStore;

#[derive(Default)]
struct Inner {
  hashes: BTreeMap<String, BTreeMap<String, String>>,
  ranked: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
    // Lock poisoning only happens if a holder panicked; tests want the data
    // regardless.
    self.inner.lock().unwrap_or_else(|e| e.into_inner())
  }
}

impl KvStore for MemoryStore {
  type Error = Infallible;

  async fn ping(&self) -> Result<(), Infallible> {
    Ok(())
  }

  async fn set_field(
    &self,
    key: &str,
    field: &str,
    value: &str,
  ) -> Result<(), Infallible> {
    self
      .lock()
      .hashes
      .entry(key.to_owned())
      .or_default()
      .insert(field.to_owned(), value.to_owned());
    Ok(())
  }

  async fn get_field(
    &self,
    key: &str,
    field: &str,
  ) -> Result<Option<String>, Infallible> {
    Ok(
      self
        .lock()
        .hashes
        .get(key)
        .and_then(|fields| fields.get(field))
        .cloned(),
    )
  }

  async fn set_field_checked(
    &self,
    key: &str,
    field: &str,
    expected: Option<&str>,
    value: &str,
  ) -> Result<bool, Infallible> {
    let mut inner = self.lock();
    let current = inner.hashes.get(key).and_then(|fields| fields.get(field));
    if current.map(String::as_str) != expected {
      return Ok(false);
    }
    inner
      .hashes
      .entry(key.to_owned())
      .or_default()
      .insert(field.to_owned(), value.to_owned());
    Ok(true)
  }

  async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, Infallible> {
    Ok(
      self
        .lock()
        .hashes
        .keys()
        .filter(|key| glob_match(pattern, key))
        .cloned()
        .collect(),
    )
  }

  async fn ranked_incr(
    &self,
    bucket: &str,
    member: &str,
    delta: f64,
  ) -> Result<f64, Infallible> {
    let mut inner = self.lock();
    let score = inner
      .ranked
      .entry(bucket.to_owned())
      .or_default()
      .entry(member.to_owned())
      .or_insert(0.0);
    *score += delta;
    Ok(*score)
  }

  async fn ranked_scan(
    &self,
    bucket: &str,
    pattern: &str,
  ) -> Result<Vec<(String, f64)>, Infallible> {
    Ok(
      self
        .lock()
        .ranked
        .get(bucket)
        .map(|members| {
          members
            .iter()
            .filter(|(member, _)| glob_match(pattern, member))
            .map(|(member, score)| (member.clone(), *score))
            .collect()
        })
        .unwrap_or_default(),
    )
  }
}

/// Match `text` against a Redis-style glob with `*` and `?` wildcards.
fn glob_match(pattern: &str, text: &str) -> bool {
  fn rec(p: &[char], t: &[char]) -> bool {
    match p.first() {
      None => t.is_empty(),
      Some('*') => rec(&p[1..], t) || (!t.is_empty() && rec(p, &t[1..])),
      Some('?') => !t.is_empty() && rec(&p[1..], &t[1..]),
      Some(c) => t.first() == Some(c) && rec(&p[1..], &t[1..]),
    }
  }
  let p: Vec<char> = pattern.chars().collect();
  let t: Vec<char> = text.chars().collect();
  rec(&p, &t)
}
